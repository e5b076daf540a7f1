//! grants.gov adapter.
//!
//! Queries the grants.gov opportunities search REST API and maps each open or
//! forecasted opportunity to a normalized draft. Opportunities without a
//! number get a content-hash identifier so re-ingestion still converges on a
//! stable key.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::config::{GrantsGovConfig, IngestConfig};
use crate::error::FetchError;
use crate::models::CfpDraft;
use crate::traits::Adapter;

const DEFAULT_BASE_URL: &str = "https://www.grants.gov/grantsws/rest/opportunities/search/";

pub const SOURCE_NAME: &str = "grants_gov";

pub struct GrantsGovAdapter {
    config: GrantsGovConfig,
    client: reqwest::Client,
}

impl GrantsGovAdapter {
    pub fn new(config: GrantsGovConfig, ingest: &IngestConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ingest.http_timeout_secs))
            .user_agent(ingest.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl Adapter for GrantsGovAdapter {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn description(&self) -> &str {
        "US federal grant opportunities from grants.gov"
    }

    async fn fetch(&self) -> Result<Vec<CfpDraft>, FetchError> {
        let url = self.base_url();
        let rows = self.config.rows.to_string();

        let resp = self
            .client
            .get(url)
            .query(&[
                ("startRecordNum", "1"),
                ("sortBy", "openDate|desc"),
                ("oppStatuses", "forecasted|posted"),
                ("rows", rows.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::http(url, e))?;

        if !resp.status().is_success() {
            return Err(FetchError::status(url, resp.status().as_u16()));
        }

        let payload: SearchResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::decode(url, e.to_string()))?;

        Ok(payload
            .opportunities
            .iter()
            .map(opportunity_to_draft)
            .collect())
    }
}

// ============ Response shape ============

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, rename = "opportunitySearchResult")]
    opportunities: Vec<Opportunity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Opportunity {
    #[serde(default)]
    opportunity_number: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    opportunity_synopsis_url: Option<String>,
    #[serde(default)]
    agency: Option<String>,
    #[serde(default)]
    close_date: Option<String>,
    #[serde(default)]
    cfda_list: Vec<Cfda>,
}

#[derive(Debug, Deserialize)]
struct Cfda {
    #[serde(default)]
    name: Option<String>,
}

// ============ Normalization ============

fn opportunity_to_draft(opp: &Opportunity) -> CfpDraft {
    let title = opp
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("Untitled");

    let source_id = match opp.opportunity_number.as_deref().filter(|n| !n.is_empty()) {
        Some(number) => number.to_string(),
        None => fallback_id(title),
    };

    let url = opp
        .opportunity_synopsis_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .unwrap_or("https://www.grants.gov/");

    let mut draft = CfpDraft::new(SOURCE_NAME, &source_id, title, url);
    draft.summary = opp.description.clone().filter(|s| !s.is_empty());
    draft.sponsor = opp.agency.clone().filter(|a| !a.is_empty());
    draft.country = Some("United States".to_string());
    draft.deadline = opp.close_date.as_deref().and_then(parse_close_date);
    draft.tags = opp
        .cfda_list
        .iter()
        .filter_map(|c| c.name.clone())
        .filter(|n| !n.is_empty())
        .collect();
    draft.currency = Some("USD".to_string());
    draft
}

/// grants.gov dates come back as `MM/DD/YYYY`.
fn parse_close_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%m/%d/%Y").ok()
}

/// Stable identifier for opportunities published without a number.
fn fallback_id(title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_response() {
        let body = r#"{
            "opportunitySearchResult": [
                {
                    "opportunityNumber": "NSF-24-501",
                    "title": "Computer Science Research Grants",
                    "description": "Funding for CS research.",
                    "opportunitySynopsisUrl": "https://www.grants.gov/view/NSF-24-501",
                    "agency": "National Science Foundation",
                    "closeDate": "03/15/2026",
                    "cfdaList": [{"name": "Computer Science"}, {"name": null}]
                },
                {
                    "title": "Unnumbered Opportunity"
                }
            ]
        }"#;

        let payload: SearchResponse = serde_json::from_str(body).unwrap();
        let drafts: Vec<CfpDraft> = payload.opportunities.iter().map(opportunity_to_draft).collect();

        assert_eq!(drafts.len(), 2);

        let first = &drafts[0];
        assert_eq!(first.source, "grants_gov");
        assert_eq!(first.source_id, "NSF-24-501");
        assert_eq!(first.sponsor.as_deref(), Some("National Science Foundation"));
        assert_eq!(first.country.as_deref(), Some("United States"));
        assert_eq!(first.deadline, NaiveDate::from_ymd_opt(2026, 3, 15));
        assert_eq!(first.tags, vec!["Computer Science".to_string()]);
        assert_eq!(first.currency.as_deref(), Some("USD"));

        let second = &drafts[1];
        assert_eq!(second.title, "Unnumbered Opportunity");
        // No number: id derives from the title and stays stable
        assert_eq!(second.source_id, fallback_id("Unnumbered Opportunity"));
        assert_eq!(second.url, "https://www.grants.gov/");
        assert!(second.deadline.is_none());
    }

    #[test]
    fn close_date_rejects_garbage() {
        assert_eq!(parse_close_date("03/15/2026"), NaiveDate::from_ymd_opt(2026, 3, 15));
        assert_eq!(parse_close_date("2026-03-15"), None);
        assert_eq!(parse_close_date("TBD"), None);
    }

    #[test]
    fn empty_response_yields_no_drafts() {
        let payload: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(payload.opportunities.is_empty());
    }
}
