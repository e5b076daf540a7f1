//! Core data models for callboard.
//!
//! These types represent the call-for-proposals records that flow through the
//! ingestion pipeline: the transient draft an adapter emits, and the persisted
//! row the store owns.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Delivery format of the event a CFP belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFormat {
    InPerson,
    Virtual,
    Hybrid,
}

impl EventFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventFormat::InPerson => "in_person",
            EventFormat::Virtual => "virtual",
            EventFormat::Hybrid => "hybrid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_person" => Some(EventFormat::InPerson),
            "virtual" => Some(EventFormat::Virtual),
            "hybrid" => Some(EventFormat::Hybrid),
            _ => None,
        }
    }
}

/// Normalized item produced by an adapter before persistence.
///
/// Adapters own no persistent state; a draft is the full output contract of
/// one fetched listing. Drafts with an empty `source_id` or `title` are
/// skipped by the ingestion run with a warning.
#[derive(Debug, Clone)]
pub struct CfpDraft {
    pub source: String,
    pub source_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub url: String,
    pub sponsor: Option<String>,
    pub country: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub event_start: Option<NaiveDate>,
    pub event_end: Option<NaiveDate>,
    pub location: Option<String>,
    pub format: Option<EventFormat>,
    pub tags: Vec<String>,
    pub currency: Option<String>,
    pub amount_min: Option<i64>,
    pub amount_max: Option<i64>,
}

impl CfpDraft {
    /// A draft with only the required fields set. Adapters fill in the rest.
    pub fn new(source: &str, source_id: &str, title: &str, url: &str) -> Self {
        Self {
            source: source.to_string(),
            source_id: source_id.to_string(),
            title: title.to_string(),
            summary: None,
            url: url.to_string(),
            sponsor: None,
            country: None,
            deadline: None,
            event_start: None,
            event_end: None,
            location: None,
            format: None,
            tags: Vec::new(),
            currency: None,
            amount_min: None,
            amount_max: None,
        }
    }
}

/// Persisted CFP row.
///
/// `(source, source_id)` is unique; re-ingestion of the same external item
/// updates the existing row. `first_seen` is set on insert and never changes;
/// `last_updated` is refreshed on every upsert.
#[derive(Debug, Clone, Serialize)]
pub struct CfpRecord {
    pub id: String,
    pub source: String,
    pub source_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub url: String,
    pub sponsor: Option<String>,
    pub country: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub event_start: Option<NaiveDate>,
    pub event_end: Option<NaiveDate>,
    pub location: Option<String>,
    pub format: Option<EventFormat>,
    pub tags: Vec<String>,
    pub currency: Option<String>,
    pub amount_min: Option<i64>,
    pub amount_max: Option<i64>,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
