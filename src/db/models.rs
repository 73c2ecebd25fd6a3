//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickStatus {
    Up,
    Down,
}

impl TickStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickStatus::Up => "up",
            TickStatus::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(TickStatus::Up),
            "down" => Some(TickStatus::Down),
            _ => None,
        }
    }
}

/// A single recorded probe result for a website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: TickStatus,
    /// Response time in milliseconds. Only meaningful for passing ticks.
    #[serde(default)]
    pub latency: Option<f64>,
}

/// A monitored website together with its recent ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub ticks: Vec<Tick>,
}

/// Rejection reasons for a new website.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("URL is required")]
    MissingUrl,
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A request to start monitoring a website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWebsite {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NewWebsite {
    /// Validate raw user input. The URL must be absolute; a blank name is
    /// treated as absent.
    pub fn parse(url: &str, name: Option<&str>) -> Result<Self, ValidationError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }

        Url::parse(url).map_err(|e| ValidationError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let name = name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);

        Ok(Self {
            url: url.to_string(),
            name,
        })
    }
}

/// A tick submitted by an upstream probe worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTick {
    /// Defaults to the time of insertion.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub status: TickStatus,
    #[serde(default)]
    pub latency: Option<f64>,
}
