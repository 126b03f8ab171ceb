//! HTTP routes.
//!
//! - `GET /api/tweets?query=<term>` resolves a term through the orchestrator
//!   and returns the snapshot JSON. The serving tier is reported in the
//!   `x-cache-source` header.
//! - `GET /healthz` is a liveness probe.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, HeaderValue, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use pulse_core::{Orchestrator, Query as SearchQuery};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::ApiError;

/// Response header naming the tier that served the snapshot.
pub const CACHE_SOURCE_HEADER: &str = "x-cache-source";

/// Request header accepted when the `query` parameter is absent.
const LEGACY_QUERY_HEADER: &str = "query";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Deserialize)]
pub struct TweetsParams {
    pub query: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tweets", get(search_tweets))
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn search_tweets(
    State(state): State<AppState>, params: Result<Query<TweetsParams>, QueryRejection>, headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    // Query parameters arrive decoded; the legacy header is still encoded.
    let query = match params.query {
        Some(term) => SearchQuery::from_decoded(&term)?,
        None => {
            let raw = headers
                .get(LEGACY_QUERY_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| ApiError::invalid_input("missing query parameter"))?;
            SearchQuery::parse(raw)?
        }
    };

    let resolution = state.orchestrator.resolve_query(&query).await?;
    if resolution.is_degraded() {
        warn!(key = %resolution.snapshot.key, "responding with stale snapshot");
    }

    let mut response = Json(resolution.snapshot).into_response();
    response
        .headers_mut()
        .insert(CACHE_SOURCE_HEADER, HeaderValue::from_static(resolution.origin.as_str()));
    Ok(response)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    let source = response
        .headers()
        .get(CACHE_SOURCE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if status.is_server_error() {
        error!(status = status.as_u16(), %method, path = %path, elapsed_ms, "request failed");
    } else if status.is_client_error() {
        warn!(status = status.as_u16(), %method, path = %path, elapsed_ms, "request rejected");
    } else {
        info!(status = status.as_u16(), %method, path = %path, elapsed_ms, source, "request served");
    }

    response
}
