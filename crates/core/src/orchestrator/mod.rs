//! Cache-aside resolution across the fast cache, the durable store and the
//! search API.
//!
//! Tier order is fast cache → durable store → upstream:
//!
//! 1. A fresh fast cache entry is returned as-is. It is trusted on freshness
//!    alone, so an externally removed durable record stays visible for at
//!    most `min(cache_ttl, window)`.
//! 2. Otherwise a fresh durable record is copied into the fast cache with its
//!    original timestamp and returned.
//! 3. A missing, stale or undecodable durable record triggers an upstream
//!    fetch; the new snapshot is written to both tiers.
//!
//! If the upstream fetch fails and an older snapshot is known, that snapshot
//! is served with [`Origin::StaleFallback`]. Tier failures are logged and
//! resolution falls through to the next tier.
//!
//! Concurrent misses on one key are coalesced: one caller resolves past the
//! fast cache and the callers queued behind it receive its outcome.

mod inflight;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    Clock, Error, FastCache, RecordStore, SearchSource,
    model::{Query, ScoredPost, Snapshot},
};
use inflight::InFlight;

/// Timing policy for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    /// Maximum snapshot age before it is refetched.
    pub window: Duration,
    /// Lifetime of fast cache entries.
    pub cache_ttl: Duration,
    /// Upper bound on a single upstream call.
    pub upstream_timeout: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(12 * 60 * 60),
            cache_ttl: Duration::from_secs(60 * 60),
            upstream_timeout: Duration::from_secs(10),
        }
    }
}

/// Tier that produced a resolved snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    FastCache,
    DurableStore,
    Upstream,
    /// Upstream failed; an out-of-window snapshot was served instead.
    StaleFallback,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::FastCache => "fast-cache",
            Origin::DurableStore => "durable-store",
            Origin::Upstream => "upstream",
            Origin::StaleFallback => "stale-fallback",
        }
    }
}

/// A snapshot together with the tier it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub snapshot: Snapshot,
    pub origin: Origin,
}

impl Resolution {
    pub fn is_degraded(&self) -> bool {
        self.origin == Origin::StaleFallback
    }
}

/// Decides which tier serves a query and keeps the tiers in sync.
pub struct Orchestrator {
    fast: Arc<dyn FastCache>,
    durable: Arc<dyn RecordStore>,
    source: Arc<dyn SearchSource>,
    clock: Arc<dyn Clock>,
    policy: FreshnessPolicy,
    window: chrono::Duration,
    inflight: InFlight<Result<Resolution, Error>>,
}

impl Orchestrator {
    pub fn new(
        fast: Arc<dyn FastCache>, durable: Arc<dyn RecordStore>, source: Arc<dyn SearchSource>, clock: Arc<dyn Clock>,
        policy: FreshnessPolicy,
    ) -> Self {
        let window = chrono::Duration::from_std(policy.window).unwrap_or(chrono::Duration::MAX);
        Self { fast, durable, source, clock, policy, window, inflight: InFlight::default() }
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    /// Resolve a raw, possibly percent-encoded search term to a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty or oversized term, and the
    /// upstream error when the search API fails and no earlier snapshot for
    /// the key exists.
    pub async fn resolve(&self, raw: &str) -> Result<Resolution, Error> {
        self.resolve_query(&Query::parse(raw)?).await
    }

    /// Resolve an already normalized query.
    ///
    /// Concurrent calls for the same key share one resolution: callers that
    /// queue behind a running resolution receive its outcome, failures and
    /// stale fallbacks included.
    pub async fn resolve_query(&self, query: &Query) -> Result<Resolution, Error> {
        let key = query.storage_key();

        if let Some(snapshot) = self.fresh_fast(&key).await {
            debug!(key = %key, "served from fast cache");
            return Ok(Resolution { snapshot, origin: Origin::FastCache });
        }

        let slot = self.inflight.slot(&key);
        let mut flight = slot.lock().await;

        // A caller that held the slot before us may have filled the fast tier.
        let cached = self.read_fast(&key).await;
        if let Some(snapshot) = cached.as_ref().filter(|s| self.is_fresh(s)) {
            debug!(key = %key, "served from fast cache after waiting on in-flight resolution");
            return Ok(Resolution { snapshot: snapshot.clone(), origin: Origin::FastCache });
        }

        if let Some(outcome) = flight.shared() {
            debug!(key = %key, ok = outcome.is_ok(), "sharing outcome of in-flight resolution");
            return share(outcome);
        }

        let outcome = self.resolve_past_fast(query, &key, cached).await;
        flight.publish(share(&outcome));
        outcome
    }

    async fn resolve_past_fast(
        &self, query: &Query, key: &str, cached: Option<Snapshot>,
    ) -> Result<Resolution, Error> {
        let durable = match self.read_durable(key).await {
            Some(snapshot) if self.is_fresh(&snapshot) => {
                debug!(key, timestamp = %snapshot.timestamp, "served from durable store");
                self.write_fast(key, &snapshot).await;
                return Ok(Resolution { snapshot, origin: Origin::DurableStore });
            }
            Some(stale) => {
                debug!(key, timestamp = %stale.timestamp, "durable record is stale");
                Some(stale)
            }
            None => None,
        };

        match self.fetch_upstream(query).await {
            Ok(data) => {
                let snapshot = Snapshot::new(query.term(), self.clock.now(), data);
                info!(key, posts = snapshot.data.len(), "fetched new snapshot from upstream");

                if let Err(e) = self.durable.write(key, &snapshot).await {
                    warn!(key, error = %e, "failed to persist snapshot to durable store");
                }
                self.write_fast(key, &snapshot).await;

                Ok(Resolution { snapshot, origin: Origin::Upstream })
            }
            Err(err) => match durable.or(cached) {
                Some(snapshot) => {
                    warn!(
                        key,
                        error = %err,
                        timestamp = %snapshot.timestamp,
                        degraded = true,
                        "upstream failed; serving stale snapshot"
                    );
                    Ok(Resolution { snapshot, origin: Origin::StaleFallback })
                }
                None => {
                    warn!(key, error = %err, "upstream failed and no snapshot is known");
                    Err(err)
                }
            },
        }
    }

    fn is_fresh(&self, snapshot: &Snapshot) -> bool {
        snapshot.is_fresh(self.clock.now(), self.window)
    }

    async fn fresh_fast(&self, key: &str) -> Option<Snapshot> {
        self.read_fast(key).await.filter(|s| self.is_fresh(s))
    }

    /// Fast cache entry of any age; tier failures read as a miss.
    async fn read_fast(&self, key: &str) -> Option<Snapshot> {
        match self.fast.read(key).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(key, error = %e, "fast cache read failed; falling through");
                None
            }
        }
    }

    /// Durable record of any age; failures and malformed records read as absent.
    async fn read_durable(&self, key: &str) -> Option<Snapshot> {
        match self.durable.exists(key).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!(key, error = %e, "durable store existence check failed; treating as absent");
                return None;
            }
        }

        match self.durable.read(key).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(key, error = %e, "durable store read failed; treating as absent");
                None
            }
        }
    }

    async fn write_fast(&self, key: &str, snapshot: &Snapshot) {
        if let Err(e) = self.fast.write(key, snapshot, self.policy.cache_ttl).await {
            warn!(key, error = %e, "failed to populate fast cache");
        }
    }

    async fn fetch_upstream(&self, query: &Query) -> Result<Vec<ScoredPost>, Error> {
        let timeout = self.policy.upstream_timeout;
        match tokio::time::timeout(timeout, self.source.search(query.term())).await {
            Ok(result) => result,
            Err(_) => Err(Error::UpstreamTimeout(format!("no response within {}ms", timeout.as_millis()))),
        }
    }
}

/// Copy of a resolution outcome for another caller.
fn share(outcome: &Result<Resolution, Error>) -> Result<Resolution, Error> {
    match outcome {
        Ok(resolution) => Ok(resolution.clone()),
        Err(err) => Err(err.duplicate()),
    }
}

#[cfg(test)]
mod tests;
