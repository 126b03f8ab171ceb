//! Client code for pulse.
//!
//! This crate provides the recent-search API client and the adapter that
//! scores its posts for the core orchestrator.

pub mod twitter;

pub use twitter::{
    Post, SearchMeta, SearchRequest, SearchResponse, TwitterClient, TwitterConfig, TwitterError, TwitterSource,
};
