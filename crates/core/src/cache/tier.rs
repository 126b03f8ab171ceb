//! Capability traits implemented by the cache tiers.
//!
//! The orchestrator only talks to tiers through these traits, so tests can
//! wrap or replace either tier.

use async_trait::async_trait;
use std::time::Duration;

use crate::{Error, model::Snapshot};

/// Durable snapshot storage. Writes are permanent until overwritten.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, Error>;

    /// Read and decode the record stored under `key`.
    ///
    /// Returns `Error::MalformedRecord` if the stored body does not decode.
    async fn read(&self, key: &str) -> Result<Option<Snapshot>, Error>;

    async fn write(&self, key: &str, snapshot: &Snapshot) -> Result<(), Error>;
}

/// Fast snapshot cache. Every write carries a time-to-live.
#[async_trait]
pub trait FastCache: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, Error>;

    /// Read and decode the unexpired entry under `key`.
    ///
    /// Returns `Error::MalformedRecord` if the stored body does not decode.
    async fn read(&self, key: &str) -> Result<Option<Snapshot>, Error>;

    async fn write(&self, key: &str, snapshot: &Snapshot, ttl: Duration) -> Result<(), Error>;
}
