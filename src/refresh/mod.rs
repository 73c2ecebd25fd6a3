//! Refresh coordinator: polls the data source and publishes derived views.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::aggregate::{derive_views, DerivedStatusView};
use crate::db::NewWebsite;
use crate::source::{DataSource, SourceError};

/// Timing for the polling loop.
#[derive(Debug, Clone, Copy)]
pub struct RefreshSettings {
    pub interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// The published state. Replaced wholesale on every publish.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub views: BTreeMap<String, DerivedStatusView>,
    pub error: Option<String>,
    /// True until the first refresh cycle completes.
    pub loading: bool,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Cycle number of the fetch that produced `views`.
    #[serde(skip)]
    pub sequence: u64,
    /// Set by `stop`; a closed snapshot accepts no further publishes.
    #[serde(skip)]
    pub closed: bool,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            views: BTreeMap::new(),
            error: None,
            loading: true,
            refreshed_at: None,
            sequence: 0,
            closed: false,
        }
    }
}

/// Polls a data source on a fixed interval and publishes derived views.
pub struct RefreshCoordinator {
    source: Arc<dyn DataSource>,
    settings: RefreshSettings,
    state_tx: watch::Sender<StatusSnapshot>,
    stop_tx: watch::Sender<bool>,
    next_sequence: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(source: Arc<dyn DataSource>, settings: RefreshSettings) -> Self {
        let (state_tx, _) = watch::channel(StatusSnapshot::default());
        let (stop_tx, _) = watch::channel(false);
        Self {
            source,
            settings,
            state_tx,
            stop_tx,
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.state_tx.borrow().clone()
    }

    /// Receiver that is notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Start the polling loop. The first refresh runs immediately.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let this = self.clone();
        let mut stop_rx = self.stop_tx.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.settings.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stopped(&mut stop_rx) => break,
                    _ = interval.tick() => {
                        tokio::select! {
                            _ = stopped(&mut stop_rx) => break,
                            _ = this.refresh_now() => {}
                        }
                    }
                }
            }

            tracing::info!("Refresh loop stopped");
        })
    }

    /// Stop the polling loop. No later refresh publishes anything.
    pub fn stop(&self) {
        // Close under the snapshot lock first so no publish can slip in after.
        self.state_tx.send_if_modified(|snap| {
            snap.closed = true;
            false
        });
        self.stop_tx.send_replace(true);
    }

    /// Run one refresh cycle outside the schedule.
    pub async fn refresh_now(&self) {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.bounded(self.source.list_websites()).await;

        match result {
            Ok(websites) => {
                let now = Utc::now();
                let views = derive_views(&websites, now);
                tracing::debug!("Refresh {} derived {} views", sequence, views.len());
                self.publish(sequence, |snap| {
                    snap.views = views;
                    snap.error = None;
                    snap.refreshed_at = Some(now);
                });
            }
            Err(e) => {
                tracing::warn!("Refresh {} failed: {}", sequence, e);
                self.publish(sequence, |snap| {
                    snap.error = Some(format!("Failed to fetch websites: {}", e));
                });
            }
        }
    }

    /// Validate and create a website, then refresh immediately.
    ///
    /// Returns false on any failure; the reason is published as the snapshot error.
    pub async fn add_target(&self, url: &str, name: Option<&str>) -> bool {
        self.try_add_target(url, name).await.is_ok()
    }

    /// Like `add_target`, but hands back the new id or the failure message.
    pub(crate) async fn try_add_target(&self, url: &str, name: Option<&str>) -> Result<String, String> {
        let request = match NewWebsite::parse(url, name) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Rejected website {:?}: {}", url, e);
                let message = e.to_string();
                self.publish_error(message.clone());
                return Err(message);
            }
        };

        match self.bounded(self.source.create_website(&request)).await {
            Ok(id) => {
                tracing::info!("Added website {} ({})", request.url, id);
                self.refresh_now().await;
                Ok(id)
            }
            Err(e) => {
                tracing::warn!("Failed to add website {}: {}", request.url, e);
                let message = format!("Failed to add website: {}", e);
                self.publish_error(message.clone());
                Err(message)
            }
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        let limit = self.settings.fetch_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(SourceError::Timeout(limit)))
    }

    /// Apply a cycle's result unless a newer cycle already published or the
    /// coordinator has been stopped.
    fn publish<F>(&self, sequence: u64, update: F)
    where
        F: FnOnce(&mut StatusSnapshot),
    {
        let applied = self.state_tx.send_if_modified(|snap| {
            if snap.closed || sequence <= snap.sequence {
                return false;
            }
            update(snap);
            snap.sequence = sequence;
            snap.loading = false;
            true
        });

        if !applied {
            tracing::debug!("Discarding refresh {} (stale or stopped)", sequence);
        }
    }

    fn publish_error(&self, message: String) {
        self.state_tx.send_if_modified(|snap| {
            if snap.closed {
                return false;
            }
            snap.error = Some(message);
            true
        });
    }
}

/// Resolves once the stop flag is set or the coordinator is dropped.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}
