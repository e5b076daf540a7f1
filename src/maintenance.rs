//! Store maintenance operations.
//!
//! The unique constraint on `(source, source_id)` makes new duplicates
//! impossible, but databases created before the constraint existed (or
//! restored from merged backups) can still carry them. Dedupe keeps the
//! earliest-inserted row per key and deletes the rest.

use anyhow::Result;
use sqlx::SqlitePool;

/// Remove duplicate rows per `(source, source_id)`, keeping the first
/// inserted. Returns the number of rows deleted.
pub async fn dedupe_cfps(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM cfps
        WHERE rowid NOT IN (
            SELECT MIN(rowid) FROM cfps GROUP BY source, source_id
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
