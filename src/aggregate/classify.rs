//! Current status and summary metrics for a tick slice.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{Tick, TickStatus};

/// Average latency (ms) above which a passing target is degraded.
pub const DEGRADED_LATENCY_MS: f64 = 1000.0;

/// Uptime percentage below which a passing target is degraded.
pub const DEGRADED_UPTIME_PERCENT: f64 = 98.0;

/// Derived status of a website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Up,
    Down,
    Degraded,
}

/// Summary metrics for one tick slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: Status,
    /// Percentage of passing ticks, rounded to two decimals.
    pub uptime_percent: f64,
    /// Mean latency of passing ticks in ms, rounded.
    pub average_latency: u64,
    pub last_observed_at: DateTime<Utc>,
}

/// Classify a chronologically ordered slice of ticks.
///
/// `invoked_at` stands in for the last observation when the slice is empty.
pub fn classify(ticks: &[Tick], invoked_at: DateTime<Utc>) -> Classification {
    let uptime = uptime_percent(ticks);
    let latency = average_latency(ticks);

    let status = match ticks.last() {
        None => Status::Down,
        Some(last) if last.status == TickStatus::Down => Status::Down,
        Some(_) if latency > DEGRADED_LATENCY_MS || uptime < DEGRADED_UPTIME_PERCENT => {
            Status::Degraded
        }
        Some(_) => Status::Up,
    };

    Classification {
        status,
        uptime_percent: (uptime * 100.0).round() / 100.0,
        average_latency: latency.round() as u64,
        last_observed_at: ticks.last().map(|t| t.created_at).unwrap_or(invoked_at),
    }
}

fn uptime_percent(ticks: &[Tick]) -> f64 {
    if ticks.is_empty() {
        return 0.0;
    }
    let up = ticks.iter().filter(|t| t.status == TickStatus::Up).count();
    up as f64 / ticks.len() as f64 * 100.0
}

/// Mean over passing ticks with a finite, strictly positive latency.
fn average_latency(ticks: &[Tick]) -> f64 {
    let (sum, count) = ticks
        .iter()
        .filter(|t| t.status == TickStatus::Up)
        .filter_map(|t| t.latency)
        .filter(|l| l.is_finite() && *l > 0.0)
        .fold((0.0, 0usize), |(sum, count), l| (sum + l, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
