//! Fixed-width time windows for the uptime chart.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;

use crate::db::{Tick, TickStatus};

/// Number of windows in a chart.
pub const WINDOW_COUNT: usize = 10;

/// Width of each window in seconds.
pub const WINDOW_SECONDS: i64 = 180;

/// One bucket of the uptime chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub window_start: DateTime<Utc>,
    pub status: TickStatus,
}

pub fn window_width() -> ChronoDuration {
    ChronoDuration::seconds(WINDOW_SECONDS)
}

/// Bucket ticks into `WINDOW_COUNT` windows ending at `now`, oldest first.
///
/// Window `k` covers `[start + k*W, start + (k+1)*W)` where
/// `start = now - WINDOW_COUNT*W`. A window is `Down` if any tick inside it
/// failed. Windows with no ticks at all report `Up`: a silent window is
/// indistinguishable from a healthy one on the chart.
pub fn aggregate_windows(ticks: &[Tick], now: DateTime<Utc>) -> Vec<Window> {
    let width = window_width();
    let span_start = now - width * WINDOW_COUNT as i32;

    let mut failed = [false; WINDOW_COUNT];
    for tick in ticks {
        if tick.status != TickStatus::Down {
            continue;
        }
        if tick.created_at < span_start || tick.created_at >= now {
            continue;
        }
        if let Some(slot) = window_index(tick.created_at - span_start, width) {
            failed[slot] = true;
        }
    }

    (0..WINDOW_COUNT)
        .map(|k| Window {
            window_start: span_start + width * k as i32,
            status: if failed[k] {
                TickStatus::Down
            } else {
                TickStatus::Up
            },
        })
        .collect()
}

fn window_index(offset: ChronoDuration, width: ChronoDuration) -> Option<usize> {
    let offset_ns = offset.num_nanoseconds()?;
    let width_ns = width.num_nanoseconds()?;
    let slot = usize::try_from(offset_ns / width_ns).ok()?;
    (slot < WINDOW_COUNT).then_some(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn tick(created_at: DateTime<Utc>, status: TickStatus) -> Tick {
        Tick {
            id: created_at.timestamp().to_string(),
            created_at,
            status,
            latency: Some(10.0),
        }
    }

    fn statuses(windows: &[Window]) -> Vec<TickStatus> {
        windows.iter().map(|w| w.status).collect()
    }

    #[test]
    fn test_empty_input_yields_all_up() {
        let windows = aggregate_windows(&[], now());
        assert_eq!(windows.len(), WINDOW_COUNT);
        assert!(windows.iter().all(|w| w.status == TickStatus::Up));
    }

    #[test]
    fn test_windows_are_contiguous_and_end_at_now() {
        let windows = aggregate_windows(&[], now());
        assert_eq!(windows[0].window_start, now() - ChronoDuration::minutes(30));
        for pair in windows.windows(2) {
            assert_eq!(pair[1].window_start - pair[0].window_start, window_width());
        }
        assert_eq!(windows[WINDOW_COUNT - 1].window_start + window_width(), now());
    }

    #[test]
    fn test_single_failure_marks_only_its_window() {
        let ticks = vec![
            tick(now() - ChronoDuration::minutes(10), TickStatus::Up),
            tick(now() - ChronoDuration::minutes(5), TickStatus::Down),
            tick(now() - ChronoDuration::minutes(4), TickStatus::Up),
        ];
        let windows = aggregate_windows(&ticks, now());

        // t-5m lies in [now-6m, now-3m), the second newest window.
        let mut expected = vec![TickStatus::Up; WINDOW_COUNT];
        expected[8] = TickStatus::Down;
        assert_eq!(statuses(&windows), expected);
    }

    #[test]
    fn test_boundaries_are_half_open() {
        let ticks = vec![
            // Exactly at the span start: first window.
            tick(now() - ChronoDuration::minutes(30), TickStatus::Down),
            // Exactly at a window edge: belongs to the later window.
            tick(now() - ChronoDuration::minutes(3), TickStatus::Down),
            // Exactly at now: outside the span.
            tick(now(), TickStatus::Down),
        ];
        let windows = aggregate_windows(&ticks, now());

        let mut expected = vec![TickStatus::Up; WINDOW_COUNT];
        expected[0] = TickStatus::Down;
        expected[9] = TickStatus::Down;
        assert_eq!(statuses(&windows), expected);
    }

    #[test]
    fn test_ticks_outside_span_are_ignored() {
        let ticks = vec![
            tick(now() - ChronoDuration::minutes(31), TickStatus::Down),
            tick(now() - ChronoDuration::hours(5), TickStatus::Down),
            tick(now() + ChronoDuration::minutes(1), TickStatus::Down),
        ];
        let windows = aggregate_windows(&ticks, now());
        assert_eq!(windows.len(), WINDOW_COUNT);
        assert!(windows.iter().all(|w| w.status == TickStatus::Up));
    }

    #[test]
    fn test_same_input_same_output() {
        let ticks: Vec<Tick> = (0..40)
            .map(|i| {
                let status = if i % 7 == 0 { TickStatus::Down } else { TickStatus::Up };
                tick(now() - ChronoDuration::seconds(i * 50), status)
            })
            .collect();
        assert_eq!(aggregate_windows(&ticks, now()), aggregate_windows(&ticks, now()));
    }
}
