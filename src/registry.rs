//! Builds the adapter registry from configuration.
//!
//! The registry is assembled once at startup and handed to the ingestion run
//! and the HTTP server. Adapter order follows the config: grants_gov first,
//! then agency instances in key order.

use anyhow::Result;

use crate::adapter_agency::AgencyAdapter;
use crate::adapter_grants_gov::GrantsGovAdapter;
use crate::config::Config;
use crate::traits::AdapterRegistry;

pub fn build_registry(config: &Config) -> Result<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();

    if let Some(gg) = &config.adapters.grants_gov {
        registry.register(Box::new(GrantsGovAdapter::new(
            gg.clone(),
            &config.ingest,
        )?));
    }

    for (name, agency) in &config.adapters.agency {
        registry.register(Box::new(AgencyAdapter::new(
            name,
            agency.clone(),
            &config.ingest,
        )?));
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AdaptersConfig, AgencyConfig, DbConfig, GrantsGovConfig, IngestConfig, ServerConfig,
    };
    use std::collections::BTreeMap;

    fn config_with_adapters() -> Config {
        let mut agency = BTreeMap::new();
        agency.insert(
            "icmr".to_string(),
            AgencyConfig {
                base: "https://www.icmr.gov.in/".to_string(),
                pages: vec!["https://www.icmr.gov.in/opportunities".to_string()],
                sponsor: None,
                country: Some("India".to_string()),
                tags: Vec::new(),
            },
        );

        Config {
            db: DbConfig {
                path: "data/test.sqlite".into(),
            },
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
            ingest: IngestConfig::default(),
            adapters: AdaptersConfig {
                grants_gov: Some(GrantsGovConfig {
                    rows: 10,
                    base_url: None,
                }),
                agency,
            },
        }
    }

    #[test]
    fn builds_all_configured_adapters() {
        let registry = build_registry(&config_with_adapters()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.find("grants_gov").is_some());
        assert!(registry.find("agency:icmr").is_some());
    }

    #[test]
    fn empty_config_builds_empty_registry() {
        let mut config = config_with_adapters();
        config.adapters = AdaptersConfig::default();
        let registry = build_registry(&config).unwrap();
        assert!(registry.is_empty());
    }
}
