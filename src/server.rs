//! HTTP API.
//!
//! Exposes the store and the ingestion trigger as a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check (returns version) |
//! | `GET`  | `/cfps` | Search stored CFPs |
//! | `POST` | `/ingest` | Run ingestion synchronously, return the summary |
//! | `POST` | `/maintenance/dedupe` | Remove legacy duplicate rows |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid date for 'before': 'soon'" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).
//!
//! `POST /ingest` blocks for the full duration of all adapter calls and
//! returns 200 whenever the run completes; failed sources are reported in
//! the summary body, not through the status code.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! dashboards.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::ingest::{run_ingestion, IngestSummary};
use crate::maintenance::dedupe_cfps;
use crate::models::CfpRecord;
use crate::search::{search_cfps, SearchParams, DEFAULT_LIMIT, MAX_LIMIT};
use crate::traits::AdapterRegistry;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub registry: Arc<AdapterRegistry>,
}

/// Build the router with all routes and the permissive CORS layer.
/// Split out from [`run_server`] so tests can drive the app in-process.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/cfps", get(handle_list_cfps))
        .route("/ingest", post(handle_ingest))
        .route("/maintenance/dedupe", post(handle_dedupe))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(
    config: &Config,
    pool: SqlitePool,
    registry: Arc<AdapterRegistry>,
) -> anyhow::Result<()> {
    let app = build_router(AppState { pool, registry });

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(addr = %config.server.bind, "HTTP server listening");
    println!("callboard listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %err, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Always succeeds, regardless of storage or adapter state.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /cfps ============

/// Raw query parameters. Dates and pagination arrive as strings so malformed
/// values produce the standard error envelope instead of a framework
/// rejection.
#[derive(Debug, Default, Deserialize)]
struct CfpsQuery {
    q: Option<String>,
    source: Option<String>,
    sponsor: Option<String>,
    country: Option<String>,
    before: Option<String>,
    after: Option<String>,
    offset: Option<String>,
    limit: Option<String>,
}

fn parse_query(raw: &CfpsQuery) -> Result<SearchParams, AppError> {
    let parse_date = |name: &str, value: &Option<String>| -> Result<Option<NaiveDate>, AppError> {
        match value {
            None => Ok(None),
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| {
                    bad_request(format!("invalid date for '{}': '{}' (expected YYYY-MM-DD)", name, s))
                }),
        }
    };

    let offset = match &raw.offset {
        None => 0,
        Some(s) => s
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 0)
            .ok_or_else(|| bad_request(format!("invalid offset: '{}'", s)))?,
    };

    let limit = match &raw.limit {
        None => DEFAULT_LIMIT,
        Some(s) => s
            .parse::<i64>()
            .ok()
            .filter(|n| (1..=MAX_LIMIT).contains(n))
            .ok_or_else(|| {
                bad_request(format!("invalid limit: '{}' (expected 1..={})", s, MAX_LIMIT))
            })?,
    };

    Ok(SearchParams {
        q: raw.q.clone(),
        source: raw.source.clone(),
        sponsor: raw.sponsor.clone(),
        country: raw.country.clone(),
        before: parse_date("before", &raw.before)?,
        after: parse_date("after", &raw.after)?,
        offset,
        limit,
    })
}

async fn handle_list_cfps(
    State(state): State<AppState>,
    Query(raw): Query<CfpsQuery>,
) -> Result<Json<Vec<CfpRecord>>, AppError> {
    let params = parse_query(&raw)?;
    let records = search_cfps(&state.pool, &params).await.map_err(internal)?;
    Ok(Json(records))
}

// ============ POST /ingest ============

async fn handle_ingest(State(state): State<AppState>) -> Result<Json<IngestSummary>, AppError> {
    let summary = run_ingestion(&state.pool, &state.registry, None)
        .await
        .map_err(internal)?;
    Ok(Json(summary))
}

// ============ POST /maintenance/dedupe ============

#[derive(Serialize)]
struct DedupeResponse {
    deleted: u64,
}

async fn handle_dedupe(State(state): State<AppState>) -> Result<Json<DedupeResponse>, AppError> {
    let deleted = dedupe_cfps(&state.pool).await.map_err(internal)?;
    Ok(Json(DedupeResponse { deleted }))
}
