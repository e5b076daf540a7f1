//! # callboard CLI
//!
//! The `callboard` binary drives database setup, ingestion, search, and the
//! HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! callboard --config ./config/callboard.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `callboard init` | Create the SQLite database and run schema migrations |
//! | `callboard sources` | List configured source adapters |
//! | `callboard ingest` | Fetch all sources and upsert records |
//! | `callboard search "<query>"` | Search stored CFPs |
//! | `callboard serve` | Start the JSON HTTP server |

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use callboard::search::SearchParams;
use callboard::{config, db, ingest, migrate, registry, search, server, sources};

/// callboard — a call-for-proposals aggregation service with pluggable
/// source adapters.
#[derive(Parser)]
#[command(
    name = "callboard",
    about = "callboard — aggregate calls for proposals into a searchable store",
    version,
    long_about = "callboard pulls CFP and funding-call listings from external sources, \
    normalizes them into one record shape, and upserts them into a searchable SQLite \
    store exposed over a JSON HTTP API and this CLI."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/callboard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the cfps table. Idempotent.
    Init,

    /// List configured source adapters.
    Sources,

    /// Run ingestion: fetch every configured source and upsert the results.
    ///
    /// A broken source is reported and skipped; the run continues with the
    /// remaining sources.
    Ingest {
        /// Only ingest this source (e.g. `grants_gov`, `agency:icmr`).
        #[arg(long)]
        source: Option<String>,

        /// Fetch and count items without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search stored CFPs.
    Search {
        /// Free-text query matched against title and summary.
        query: String,

        /// Filter to one source.
        #[arg(long)]
        source: Option<String>,

        /// Filter to one sponsor.
        #[arg(long)]
        sponsor: Option<String>,

        /// Filter to one country.
        #[arg(long)]
        country: Option<String>,

        /// Deadline on or before this date (YYYY-MM-DD).
        #[arg(long)]
        before: Option<NaiveDate>,

        /// Deadline on or after this date (YYYY-MM-DD).
        #[arg(long)]
        after: Option<NaiveDate>,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Start the JSON HTTP server on the configured bind address.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("callboard=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            let registry = registry::build_registry(&cfg)?;
            sources::list_sources(&registry)?;
        }
        Commands::Ingest { source, dry_run } => {
            let registry = registry::build_registry(&cfg)?;
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            ingest::run_ingest_cli(&pool, &registry, source.as_deref(), dry_run).await?;
            pool.close().await;
        }
        Commands::Search {
            query,
            source,
            sponsor,
            country,
            before,
            after,
            limit,
        } => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            let params = SearchParams {
                q: Some(query),
                source,
                sponsor,
                country,
                before,
                after,
                limit: limit.unwrap_or(search::DEFAULT_LIMIT),
                ..Default::default()
            };
            search::run_search(&pool, &params).await?;
            pool.close().await;
        }
        Commands::Serve => {
            let registry = Arc::new(registry::build_registry(&cfg)?);
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            server::run_server(&cfg, pool, registry).await?;
        }
    }

    Ok(())
}
