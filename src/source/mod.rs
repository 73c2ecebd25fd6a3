//! Data sources the refresh coordinator polls.
//!
//! A source lists monitored websites with their recent ticks and accepts new
//! websites. It is either the local SQLite store or a remote datastore API.

mod http;
mod local;

pub use http::*;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::db::{DbError, NewWebsite, Website};

/// Data source error types.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("unauthorized: {0}")]
    Auth(String),
    #[error("datastore returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Store(#[from] DbError),
}

/// Abstract interface to the website/tick datastore.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// List monitored websites, each with its recent ticks.
    async fn list_websites(&self) -> Result<Vec<Website>, SourceError>;

    /// Register a new website and return its id.
    async fn create_website(&self, website: &NewWebsite) -> Result<String, SourceError>;
}
