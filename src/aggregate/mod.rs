//! Aggregation of raw ticks into the per-website status view.
//!
//! Everything here is a pure function of the tick history and a reference
//! time; nothing is persisted.

mod classify;
mod name;
mod window;

pub use classify::*;
pub use name::*;
pub use window::*;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::db::{Tick, Website};

/// Only this many of the most recent ticks influence a view.
pub const RECENT_TICK_LIMIT: usize = 100;

/// Derived status of one website for one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStatusView {
    pub id: String,
    pub name: String,
    pub url: String,
    pub status: Status,
    pub uptime_percent: f64,
    pub average_latency: u64,
    pub last_observed_at: DateTime<Utc>,
    pub windows: Vec<Window>,
}

/// The most recent `RECENT_TICK_LIMIT` ticks in time order.
///
/// Input that is already ordered is borrowed; otherwise a sorted copy is made.
pub fn recent_ticks(ticks: &[Tick]) -> Cow<'_, [Tick]> {
    let ordered = ticks.windows(2).all(|w| w[0].created_at <= w[1].created_at);
    if ordered {
        let skip = ticks.len().saturating_sub(RECENT_TICK_LIMIT);
        return Cow::Borrowed(&ticks[skip..]);
    }

    let mut sorted = ticks.to_vec();
    sorted.sort_by_key(|t| t.created_at);
    let skip = sorted.len().saturating_sub(RECENT_TICK_LIMIT);
    sorted.drain(..skip);
    Cow::Owned(sorted)
}

/// Build the status view for a single website at reference time `now`.
pub fn derive_view(website: &Website, now: DateTime<Utc>) -> DerivedStatusView {
    let slice = recent_ticks(&website.ticks);
    let classification = classify(&slice, now);

    DerivedStatusView {
        id: website.id.clone(),
        name: display_name(&website.url, website.name.as_deref()),
        url: website.url.clone(),
        status: classification.status,
        uptime_percent: classification.uptime_percent,
        average_latency: classification.average_latency,
        last_observed_at: classification.last_observed_at,
        windows: aggregate_windows(&slice, now),
    }
}

/// Build views for every website, keyed by website id.
pub fn derive_views(websites: &[Website], now: DateTime<Utc>) -> BTreeMap<String, DerivedStatusView> {
    websites
        .iter()
        .map(|w| (w.id.clone(), derive_view(w, now)))
        .collect()
}
