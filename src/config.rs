use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("callboard/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdaptersConfig {
    pub grants_gov: Option<GrantsGovConfig>,
    /// Agency listing-page adapters, one instance per key:
    /// `[adapters.agency.icmr]`, `[adapters.agency.dst]`, ...
    #[serde(default)]
    pub agency: BTreeMap<String, AgencyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GrantsGovConfig {
    #[serde(default = "default_grants_rows")]
    pub rows: u32,
    /// Override the API endpoint (points the adapter at a local stub).
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_grants_rows() -> u32 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgencyConfig {
    /// Base URL used to absolutize relative links found on listing pages.
    pub base: String,
    /// Listing pages to scan for call announcements.
    pub pages: Vec<String>,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.ingest.http_timeout_secs == 0 {
        anyhow::bail!("ingest.http_timeout_secs must be > 0");
    }

    if let Some(ref gg) = config.adapters.grants_gov {
        if gg.rows == 0 {
            anyhow::bail!("adapters.grants_gov.rows must be > 0");
        }
    }

    for (name, agency) in &config.adapters.agency {
        if agency.base.trim().is_empty() {
            anyhow::bail!("adapters.agency.{}.base must not be empty", name);
        }
        if agency.pages.is_empty() {
            anyhow::bail!("adapters.agency.{} must list at least one page", name);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("callboard.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn parse_full_config() {
        let (_dir, path) = write_config(
            r#"
[db]
path = "data/callboard.sqlite"

[server]
bind = "127.0.0.1:8080"

[ingest]
http_timeout_secs = 10
user_agent = "callboard-test"

[adapters.grants_gov]
rows = 25

[adapters.agency.icmr]
base = "https://www.icmr.gov.in/"
pages = ["https://www.icmr.gov.in/opportunities"]
sponsor = "Indian Council of Medical Research"
country = "India"
tags = ["medical-research"]
"#,
        );

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.ingest.http_timeout_secs, 10);
        assert_eq!(config.adapters.grants_gov.unwrap().rows, 25);
        assert_eq!(config.adapters.agency.len(), 1);
        assert_eq!(
            config.adapters.agency["icmr"].country.as_deref(),
            Some("India")
        );
    }

    #[test]
    fn defaults_apply_when_sections_omitted() {
        let (_dir, path) = write_config(
            r#"
[db]
path = "data/callboard.sqlite"

[server]
bind = "127.0.0.1:8080"
"#,
        );

        let config = load_config(&path).unwrap();
        assert_eq!(config.ingest.http_timeout_secs, 30);
        assert!(config.ingest.user_agent.starts_with("callboard/"));
        assert!(config.adapters.grants_gov.is_none());
        assert!(config.adapters.agency.is_empty());
    }

    #[test]
    fn rejects_zero_rows() {
        let (_dir, path) = write_config(
            r#"
[db]
path = "data/callboard.sqlite"

[server]
bind = "127.0.0.1:8080"

[adapters.grants_gov]
rows = 0
"#,
        );

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("rows must be > 0"));
    }

    #[test]
    fn rejects_agency_without_pages() {
        let (_dir, path) = write_config(
            r#"
[db]
path = "data/callboard.sqlite"

[server]
bind = "127.0.0.1:8080"

[adapters.agency.dst]
base = "https://dst.gov.in/"
pages = []
"#,
        );

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("at least one page"));
    }
}
