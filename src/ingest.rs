//! Ingestion run orchestration.
//!
//! One run walks the adapter registry in order, fetches each source, and
//! upserts the returned drafts keyed by `(source, source_id)`. A broken source
//! never aborts the run: its failure is recorded in the summary and the loop
//! moves on. Storage errors abort the run and propagate to the caller.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::CfpDraft;
use crate::traits::AdapterRegistry;

/// Outcome of one upsert, used for the per-source counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Per-source counts for a completed fetch.
#[derive(Debug, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub added: u64,
    pub updated: u64,
}

/// A source that could not be fetched this run.
#[derive(Debug, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

/// Result of one complete ingestion run.
#[derive(Debug, Serialize)]
pub struct IngestSummary {
    pub added: u64,
    pub updated: u64,
    pub sources: Vec<SourceReport>,
    pub failures: Vec<SourceFailure>,
}

/// Run ingestion over all registered adapters, or a single one when
/// `source_filter` is set. Adapters run sequentially; there is no fan-out.
pub async fn run_ingestion(
    pool: &SqlitePool,
    registry: &AdapterRegistry,
    source_filter: Option<&str>,
) -> Result<IngestSummary> {
    if let Some(filter) = source_filter {
        if registry.find(filter).is_none() {
            anyhow::bail!("Unknown source: '{}'. See `callboard sources`.", filter);
        }
    }

    let mut summary = IngestSummary {
        added: 0,
        updated: 0,
        sources: Vec::new(),
        failures: Vec::new(),
    };

    for adapter in registry.adapters() {
        if let Some(filter) = source_filter {
            if adapter.name() != filter {
                continue;
            }
        }

        let drafts = match adapter.fetch().await {
            Ok(drafts) => drafts,
            Err(e) => {
                tracing::warn!(source = %adapter.name(), error = %e, "source fetch failed");
                summary.failures.push(SourceFailure {
                    source: adapter.name().to_string(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        let mut report = SourceReport {
            source: adapter.name().to_string(),
            added: 0,
            updated: 0,
        };

        for draft in &drafts {
            if draft.source_id.is_empty() || draft.title.is_empty() {
                tracing::warn!(source = %adapter.name(), url = %draft.url, "skipping draft without source_id or title");
                continue;
            }

            match upsert_cfp(pool, draft).await? {
                UpsertOutcome::Inserted => report.added += 1,
                UpsertOutcome::Updated => report.updated += 1,
            }
        }

        summary.added += report.added;
        summary.updated += report.updated;
        summary.sources.push(report);
    }

    tracing::info!(
        added = summary.added,
        updated = summary.updated,
        failed_sources = summary.failures.len(),
        "ingestion run complete"
    );

    Ok(summary)
}

/// Insert or update one record keyed by `(source, source_id)`.
///
/// An existing row keeps its `id` and `first_seen`. Everything else is
/// refreshed, including `last_updated`, so a re-observed unchanged record
/// still counts as updated.
pub async fn upsert_cfp(pool: &SqlitePool, draft: &CfpDraft) -> Result<UpsertOutcome> {
    let fingerprint = compute_fingerprint(draft);

    let existing_id: Option<String> =
        sqlx::query_scalar("SELECT id FROM cfps WHERE source = ? AND source_id = ?")
            .bind(&draft.source)
            .bind(&draft.source_id)
            .fetch_optional(pool)
            .await?;

    let outcome = if existing_id.is_some() {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Inserted
    };

    let id = existing_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let now = Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO cfps (id, source, source_id, title, summary, url, sponsor, country,
                          deadline, event_start, event_end, location, format, tags,
                          currency, amount_min, amount_max, first_seen, last_updated, fingerprint)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(source, source_id) DO UPDATE SET
            title = excluded.title,
            summary = excluded.summary,
            url = excluded.url,
            sponsor = excluded.sponsor,
            country = excluded.country,
            deadline = excluded.deadline,
            event_start = excluded.event_start,
            event_end = excluded.event_end,
            location = excluded.location,
            format = excluded.format,
            tags = excluded.tags,
            currency = excluded.currency,
            amount_min = excluded.amount_min,
            amount_max = excluded.amount_max,
            last_updated = excluded.last_updated,
            fingerprint = excluded.fingerprint
        "#,
    )
    .bind(&id)
    .bind(&draft.source)
    .bind(&draft.source_id)
    .bind(&draft.title)
    .bind(&draft.summary)
    .bind(&draft.url)
    .bind(&draft.sponsor)
    .bind(&draft.country)
    .bind(draft.deadline.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(draft.event_start.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(draft.event_end.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&draft.location)
    .bind(draft.format.map(|f| f.as_str()))
    .bind(join_tags(&draft.tags))
    .bind(&draft.currency)
    .bind(draft.amount_min)
    .bind(draft.amount_max)
    .bind(now)
    .bind(now)
    .bind(&fingerprint)
    .execute(pool)
    .await?;

    Ok(outcome)
}

fn join_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(","))
    }
}

/// Content identity over the normalized fields, recorded with every upsert.
/// The unit separator keeps adjacent fields from colliding.
pub fn compute_fingerprint(draft: &CfpDraft) -> String {
    let date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
    };
    let int = |n: Option<i64>| n.map(|n| n.to_string()).unwrap_or_default();

    let parts = [
        draft.title.clone(),
        draft.summary.clone().unwrap_or_default(),
        draft.url.clone(),
        draft.sponsor.clone().unwrap_or_default(),
        draft.country.clone().unwrap_or_default(),
        date(draft.deadline),
        date(draft.event_start),
        date(draft.event_end),
        draft.location.clone().unwrap_or_default(),
        draft.format.map(|f| f.as_str().to_string()).unwrap_or_default(),
        draft.tags.join(","),
        draft.currency.clone().unwrap_or_default(),
        int(draft.amount_min),
        int(draft.amount_max),
    ];

    let mut hasher = Sha256::new();
    hasher.update(parts.join("\x1f").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// CLI entry point: run (or dry-run) ingestion and print the summary.
pub async fn run_ingest_cli(
    pool: &SqlitePool,
    registry: &AdapterRegistry,
    source_filter: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        if let Some(filter) = source_filter {
            if registry.find(filter).is_none() {
                anyhow::bail!("Unknown source: '{}'. See `callboard sources`.", filter);
            }
        }

        println!("ingest (dry-run)");
        for adapter in registry.adapters() {
            if let Some(filter) = source_filter {
                if adapter.name() != filter {
                    continue;
                }
            }
            match adapter.fetch().await {
                Ok(drafts) => println!("  {}: {} items", adapter.name(), drafts.len()),
                Err(e) => println!("  {}: failed: {}", adapter.name(), e),
            }
        }
        println!("ok");
        return Ok(());
    }

    let summary = run_ingestion(pool, registry, source_filter).await?;

    println!("ingest");
    for report in &summary.sources {
        println!(
            "  {}: {} added, {} updated",
            report.source, report.added, report.updated
        );
    }
    for failure in &summary.failures {
        println!("  {}: failed: {}", failure.source, failure.error);
    }
    println!("  total: {} added, {} updated", summary.added, summary.updated);
    println!("ok");

    Ok(())
}
