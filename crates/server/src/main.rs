//! pulse server entry point.
//!
//! Loads configuration, opens the durable store, wires the fast cache and the
//! search client into the orchestrator, and serves the HTTP API until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pulse_client::{TwitterClient, TwitterConfig, TwitterSource};
use chrono::{DateTime, Utc};
use pulse_core::{AppConfig, Clock, LexiconScorer, MemoryCache, Orchestrator, RecordDb, SystemClock};
use tracing_subscriber::EnvFilter;

mod error;
mod routes;

/// Durable records older than this many freshness windows are purged at startup.
const RETENTION_WINDOWS: u32 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = AppConfig::load()?;
    let bearer_token = config.require_bearer_token()?.to_string();
    let policy = config.freshness_policy();

    let clock = Arc::new(SystemClock);
    let db = RecordDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening record store at {}", config.db_path.display()))?
        .with_clock(clock.clone());

    match retention_cutoff(clock.now(), policy.window) {
        Some(cutoff) => match db.purge_older_than(cutoff).await {
            Ok(purged) => tracing::info!(purged, %cutoff, "purged expired records"),
            Err(e) => tracing::warn!(error = %e, "failed to purge expired records"),
        },
        None => tracing::warn!(
            window_secs = policy.window.as_secs(),
            "retention period out of range; skipping purge"
        ),
    }

    let fast = Arc::new(MemoryCache::new(config.cache_capacity(), clock.clone()));

    let client = TwitterClient::new(TwitterConfig {
        bearer_token,
        base_url: config.search_base_url.clone(),
        timeout: config.timeout(),
        user_agent: config.user_agent.clone(),
        max_results: config.max_results,
    })?;
    let source = Arc::new(TwitterSource::new(client, Arc::new(LexiconScorer)));

    let orchestrator = Orchestrator::new(fast, Arc::new(db), source, clock, policy);
    let app = routes::router(routes::AppState { orchestrator: Arc::new(orchestrator) });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    tracing::info!(
        addr = %config.bind_addr,
        freshness_secs = config.freshness_secs,
        cache_ttl_secs = config.cache_ttl_secs,
        "starting pulse server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("pulse server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

/// Oldest write time kept by the startup purge, or None if the retention
/// period cannot be represented.
fn retention_cutoff(now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    let retention = window.checked_mul(RETENTION_WINDOWS)?;
    let retention = chrono::Duration::from_std(retention).ok()?;
    now.checked_sub_signed(retention)
}
