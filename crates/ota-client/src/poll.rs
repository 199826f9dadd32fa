//! Periodic refresh of backend views
//!
//! [`PollHandle`] runs a fetch immediately and then once per interval until
//! it is stopped or dropped. [`DownloadMonitor`] uses it to keep the list of
//! active downloads fresh.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ota_core::DownloadRequest;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::client::OtaClient;
use crate::error::Result;
use crate::sequence::Latest;

/// Running periodic task; cancelled on [`stop`](Self::stop) or drop
#[derive(Debug)]
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Spawn `tick` now and then every `interval`
    ///
    /// Ticks never overlap: a slow fetch delays the next one.
    pub fn spawn<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick().await;
            }
        });
        Self { task: Some(task) }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the task; no fetch starts afterwards
    pub fn stop(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Latest known state of the active downloads view
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorUpdate {
    /// Nothing fetched yet
    Idle,
    Downloads(Vec<DownloadRequest>),
    /// The newest fetch failed with this message
    Failed(String),
}

#[derive(Debug)]
struct Shared {
    client: OtaClient,
    latest: Latest<Vec<DownloadRequest>>,
    updates: watch::Sender<MonitorUpdate>,
    fetches: AtomicU64,
}

impl Shared {
    async fn refresh(&self) -> Result<Vec<DownloadRequest>> {
        let ticket = self.latest.begin();
        self.fetches.fetch_add(1, Ordering::Relaxed);

        match self.client.requests().active_downloads().await {
            Ok(downloads) => {
                debug!("{} active downloads", downloads.len());
                if self.latest.accept(ticket, downloads.clone()) {
                    self.updates
                        .send_replace(MonitorUpdate::Downloads(downloads.clone()));
                }
                Ok(downloads)
            }
            Err(e) => {
                warn!("Failed to fetch active downloads: {}", e);
                if self.latest.is_current(ticket) {
                    self.updates.send_replace(MonitorUpdate::Failed(e.to_string()));
                }
                Err(e)
            }
        }
    }
}

/// Active downloads view with optional auto-refresh
#[derive(Debug)]
pub struct DownloadMonitor {
    shared: Arc<Shared>,
    interval: Duration,
    poll: Option<PollHandle>,
}

impl DownloadMonitor {
    pub fn new(client: OtaClient, interval: Duration) -> Self {
        let (updates, _) = watch::channel(MonitorUpdate::Idle);
        Self {
            shared: Arc::new(Shared {
                client,
                latest: Latest::new(),
                updates,
                fetches: AtomicU64::new(0),
            }),
            interval,
            poll: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch once, outside the poll schedule
    pub async fn refresh(&self) -> Result<Vec<DownloadRequest>> {
        self.shared.refresh().await
    }

    /// Start or stop periodic refresh
    pub fn set_auto_refresh(&mut self, enabled: bool) {
        match (enabled, self.poll.take()) {
            (true, Some(poll)) => self.poll = Some(poll),
            (true, None) => {
                debug!("Auto-refresh every {:?}", self.interval);
                let shared = Arc::clone(&self.shared);
                self.poll = Some(PollHandle::spawn(self.interval, move || {
                    let shared = Arc::clone(&shared);
                    async move {
                        // Failures are published as MonitorUpdate::Failed
                        let _ = shared.refresh().await;
                    }
                }));
            }
            (false, Some(poll)) => {
                debug!("Auto-refresh stopped");
                poll.stop();
            }
            (false, None) => {}
        }
    }

    pub fn is_auto_refresh(&self) -> bool {
        self.poll.is_some()
    }

    /// Downloads from the newest successful fetch
    pub fn current(&self) -> Option<Vec<DownloadRequest>> {
        self.shared.latest.get()
    }

    /// Receive every published update
    pub fn subscribe(&self) -> watch::Receiver<MonitorUpdate> {
        self.shared.updates.subscribe()
    }

    /// Number of fetches started so far
    pub fn fetch_count(&self) -> u64 {
        self.shared.fetches.load(Ordering::Relaxed)
    }
}
