//! Parameterized search over stored CFP records.
//!
//! Free-text matching is a `LIKE` over title and summary; the remaining
//! filters are exact. Results are ordered by deadline ascending with undated
//! records last, matching how a person scans a list of open calls.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{CfpRecord, EventFormat};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Free-text match against title and summary.
    pub q: Option<String>,
    pub source: Option<String>,
    pub sponsor: Option<String>,
    pub country: Option<String>,
    /// Deadline on or before this date. Undated records are included, since
    /// an unknown deadline may still be inside the window.
    pub before: Option<NaiveDate>,
    /// Deadline on or after this date. Undated records are excluded.
    pub after: Option<NaiveDate>,
    pub offset: i64,
    pub limit: i64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            q: None,
            source: None,
            sponsor: None,
            country: None,
            before: None,
            after: None,
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

pub async fn search_cfps(pool: &SqlitePool, params: &SearchParams) -> Result<Vec<CfpRecord>> {
    let (sql, binds) = build_search_sql(params);

    let mut query = sqlx::query(&sql);
    for bind in &binds {
        query = query.bind(bind.as_str());
    }
    query = query.bind(params.limit).bind(params.offset);

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_record).collect()
}

/// Build the filtered SELECT with `?` placeholders and the text binds in
/// order. Limit and offset are bound by the caller after the text binds.
fn build_search_sql(params: &SearchParams) -> (String, Vec<String>) {
    let mut sql = String::from(
        "SELECT id, source, source_id, title, summary, url, sponsor, country, \
         deadline, event_start, event_end, location, format, tags, currency, \
         amount_min, amount_max, first_seen, last_updated \
         FROM cfps WHERE 1=1",
    );
    let mut binds: Vec<String> = Vec::new();

    if let Some(q) = params.q.as_deref().filter(|q| !q.trim().is_empty()) {
        sql.push_str(" AND (title LIKE ? ESCAPE '\\' OR summary LIKE ? ESCAPE '\\')");
        let pattern = format!("%{}%", escape_like(q.trim()));
        binds.push(pattern.clone());
        binds.push(pattern);
    }

    if let Some(source) = &params.source {
        sql.push_str(" AND source = ?");
        binds.push(source.clone());
    }

    if let Some(sponsor) = &params.sponsor {
        sql.push_str(" AND sponsor = ?");
        binds.push(sponsor.clone());
    }

    if let Some(country) = &params.country {
        sql.push_str(" AND country = ?");
        binds.push(country.clone());
    }

    if let Some(before) = params.before {
        sql.push_str(" AND (deadline <= ? OR deadline IS NULL)");
        binds.push(before.format("%Y-%m-%d").to_string());
    }

    if let Some(after) = params.after {
        sql.push_str(" AND deadline >= ?");
        binds.push(after.format("%Y-%m-%d").to_string());
    }

    sql.push_str(" ORDER BY (deadline IS NULL), deadline ASC, id ASC LIMIT ? OFFSET ?");

    (sql, binds)
}

/// Escape LIKE wildcards in user-supplied query text.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn row_to_record(row: &SqliteRow) -> Result<CfpRecord> {
    let tags: Option<String> = row.get("tags");
    let format: Option<String> = row.get("format");
    let first_seen: i64 = row.get("first_seen");
    let last_updated: i64 = row.get("last_updated");

    Ok(CfpRecord {
        id: row.get("id"),
        source: row.get("source"),
        source_id: row.get("source_id"),
        title: row.get("title"),
        summary: row.get("summary"),
        url: row.get("url"),
        sponsor: row.get("sponsor"),
        country: row.get("country"),
        deadline: parse_date_column(row.get("deadline")),
        event_start: parse_date_column(row.get("event_start")),
        event_end: parse_date_column(row.get("event_end")),
        location: row.get("location"),
        format: format.as_deref().and_then(EventFormat::parse),
        tags: split_tags(tags.as_deref()),
        currency: row.get("currency"),
        amount_min: row.get("amount_min"),
        amount_max: row.get("amount_max"),
        first_seen: chrono::DateTime::from_timestamp(first_seen, 0).unwrap_or_default(),
        last_updated: chrono::DateTime::from_timestamp(last_updated, 0).unwrap_or_default(),
    })
}

fn parse_date_column(value: Option<String>) -> Option<NaiveDate> {
    value.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

pub(crate) fn split_tags(joined: Option<&str>) -> Vec<String> {
    joined
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// CLI entry point: run a search and print results.
pub async fn run_search(pool: &SqlitePool, params: &SearchParams) -> Result<()> {
    let results = search_cfps(pool, params).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, record) in results.iter().enumerate() {
        let deadline = record
            .deadline
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "no deadline".to_string());

        println!("{}. [{}] {}", i + 1, record.source, record.title);
        println!("    deadline: {}", deadline);
        if let Some(ref sponsor) = record.sponsor {
            println!("    sponsor: {}", sponsor);
        }
        if !record.tags.is_empty() {
            println!("    tags: {}", record.tags.join(", "));
        }
        println!("    url: {}", record.url);
        println!("    id: {}", record.id);
        println!();
    }

    Ok(())
}
