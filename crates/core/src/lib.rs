//! Core types and shared functionality for pulse.
//!
//! This crate provides:
//! - Snapshot data model and query normalization
//! - Durable record store (SQLite) and in-memory fast cache
//! - The cache orchestrator that decides which tier serves a query
//! - Sentiment scoring, configuration and unified error types

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod sentiment;
pub mod source;

pub use cache::{FastCache, MemoryCache, RecordDb, RecordStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use model::{Query, ScoredPost, SentimentLabel, Snapshot};
pub use orchestrator::{FreshnessPolicy, Orchestrator, Origin, Resolution};
pub use sentiment::{LexiconScorer, Sentiment, SentimentScorer};
pub use source::SearchSource;
