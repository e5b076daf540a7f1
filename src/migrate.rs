use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Dates are ISO `YYYY-MM-DD` text so range filters compare correctly;
    // timestamps are Unix epoch seconds.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cfps (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            source_id TEXT NOT NULL,
            title TEXT NOT NULL,
            summary TEXT,
            url TEXT NOT NULL,
            sponsor TEXT,
            country TEXT,
            deadline TEXT,
            event_start TEXT,
            event_end TEXT,
            location TEXT,
            format TEXT,
            tags TEXT,
            currency TEXT,
            amount_min INTEGER,
            amount_max INTEGER,
            first_seen INTEGER NOT NULL,
            last_updated INTEGER NOT NULL,
            fingerprint TEXT NOT NULL,
            UNIQUE(source, source_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cfps_source ON cfps(source)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cfps_deadline ON cfps(deadline)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cfps_sponsor ON cfps(sponsor)")
        .execute(pool)
        .await?;

    Ok(())
}
