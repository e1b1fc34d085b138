//! HTTP daemon/server mode for `doxsearch`.
//!
//! This module exposes a small HTTP+JSON API that mirrors the core
//! entry points:
//!
//! - `POST /v1/search` – accepts a JSON-encoded `SearchConfig` and
//!   returns a `SearchResult`.
//! - `POST /v1/index` – accepts a JSON-encoded `IndexConfig` and
//!   returns an `IndexSummary`.
//! - `POST /v1/index/info` – describes an existing index.
//! - `POST /v1/validate` – accepts a `ValidateConfig` and returns a
//!   `ValidationReport`. A report that did not pass is still a 200.
//! - `GET /v1/health` – simple health check endpoint.
//!
//! The server only performs JSON (de)serialization, delegates to the
//! core engine, and converts errors into JSON HTTP responses.

use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::models::{
    IndexConfig, IndexSummary, SearchConfig, SearchResult, ValidateConfig, ValidationReport,
};
use crate::search::engine;

/// Simple health-check response payload.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// JSON error body returned by the API.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error type used by HTTP handlers to map internal failures into
/// JSON error responses.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{err:#}");
        if message.starts_with("index not found at ") {
            Self {
                status: StatusCode::NOT_FOUND,
                message,
            }
        } else {
            ApiError::bad_request(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Build the Axum router for the doxsearch HTTP API.
pub fn router() -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/search", post(search))
        .route("/v1/index", post(index))
        .route("/v1/index/info", post(index_info))
        .route("/v1/validate", post(validate))
}

/// Run the HTTP server bound to the provided socket address.
///
/// This is used by the CLI `doxsearch serve` subcommand.
pub async fn run(addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    serve_with_listener(listener).await
}

/// Run the HTTP server using an existing `TcpListener`.
///
/// This is primarily used in tests to bind to an ephemeral port.
pub async fn serve_with_listener(listener: TcpListener) -> Result<()> {
    let app = router();
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn search(Json(config): Json<SearchConfig>) -> Result<Json<SearchResult>, ApiError> {
    tracing::debug!("search request: {}", config.pattern);
    let result = engine::run_search(config).map_err(ApiError::from)?;
    Ok(Json(result))
}

async fn index(Json(config): Json<IndexConfig>) -> Result<Json<IndexSummary>, ApiError> {
    let summary = crate::index::run_index(config).map_err(ApiError::from)?;
    Ok(Json(summary))
}

async fn index_info(Json(config): Json<IndexConfig>) -> Result<Json<IndexSummary>, ApiError> {
    let summary = crate::index::get_index_info(&config).map_err(ApiError::from)?;
    Ok(Json(summary))
}

async fn validate(
    Json(config): Json<ValidateConfig>,
) -> Result<Json<ValidationReport>, ApiError> {
    let report = crate::validate::run_validate(config).map_err(ApiError::from)?;
    Ok(Json(report))
}
