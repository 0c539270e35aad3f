//! Polling filesystem watch
//!
//! Observes the immediate entries of one directory (not recursive) and
//! publishes a [`ChangeNotification`] for every poll cycle that saw any
//! create, delete, rename, or modification. Notifications are coalesced:
//! consumers should re-read the directory rather than expect a diff.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum WatchStartError {
    #[error("Watch root does not exist: {0}")]
    NotFound(PathBuf),

    #[error("Watch root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to read watch root {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchState {
    Idle,
    Watching,
    Stopped,
}

/// "Something under the root changed"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeNotification {
    /// Monotonic per watch, starting at 1
    pub sequence: u64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EntryStamp {
    is_dir: bool,
    len: u64,
    modified: Option<SystemTime>,
}

type Snapshot = HashMap<OsString, EntryStamp>;

/// Starts watches with a fixed poll interval
#[derive(Debug, Clone, Copy)]
pub struct WatchService {
    poll_interval: Duration,
}

impl Default for WatchService {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl WatchService {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Begins watching `root`
    ///
    /// The baseline snapshot is taken before this returns, so any change
    /// made afterwards is reported. Must be called from within a tokio
    /// runtime.
    ///
    /// # Returns
    ///
    /// * `Ok(WatchHandle)` - Watch is in the `watching` state
    /// * `Err(WatchStartError)` - Root missing, not a directory, or unreadable
    pub fn start(&self, root: impl Into<PathBuf>) -> Result<WatchHandle, WatchStartError> {
        let root = root.into();
        let (state_tx, _) = watch::channel(WatchState::Idle);

        let metadata = std::fs::metadata(&root).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                WatchStartError::NotFound(root.clone())
            } else {
                WatchStartError::Io {
                    path: root.clone(),
                    source,
                }
            }
        })?;
        if !metadata.is_dir() {
            return Err(WatchStartError::NotADirectory(root));
        }

        let baseline = snapshot(&root).map_err(|source| WatchStartError::Io {
            path: root.clone(),
            source,
        })?;

        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let state_tx = Arc::new(state_tx);
        state_tx.send_replace(WatchState::Watching);

        tokio::spawn(poll_loop(
            root.clone(),
            self.poll_interval,
            Some(baseline),
            events.clone(),
            cancel.clone(),
            state_tx.clone(),
        ));

        tracing::info!(
            root = %root.display(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Filesystem watch started"
        );

        Ok(WatchHandle {
            root,
            events,
            cancel,
            state: state_tx,
        })
    }
}

/// A running watch over one directory
///
/// Dropping the handle stops the watch.
#[derive(Debug)]
pub struct WatchHandle {
    root: PathBuf,
    events: broadcast::Sender<ChangeNotification>,
    cancel: CancellationToken,
    state: Arc<watch::Sender<WatchState>>,
}

impl WatchHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Receiver that resolves whenever the state changes
    pub fn state_changes(&self) -> watch::Receiver<WatchState> {
        self.state.subscribe()
    }

    /// New independent sequence of notifications observed from now on
    pub fn subscribe(&self) -> ChangeEvents {
        ChangeEvents {
            receiver: self.events.subscribe(),
            stopped: self.cancel.clone(),
        }
    }

    /// Stops polling and releases the watch; idempotent
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.state.send_replace(WatchState::Stopped);
        tracing::info!(root = %self.root.display(), "Filesystem watch stopped");
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lazy, non-restartable sequence of change notifications
#[derive(Debug)]
pub struct ChangeEvents {
    receiver: broadcast::Receiver<ChangeNotification>,
    stopped: CancellationToken,
}

impl ChangeEvents {
    /// Waits for the next notification
    ///
    /// Returns `None` once the watch has stopped. A subscriber that fell
    /// behind receives only the newest buffered notification.
    pub async fn next(&mut self) -> Option<ChangeNotification> {
        loop {
            // The handle keeps its sender alive, so `Closed` alone cannot
            // signal a stop.
            let received = tokio::select! {
                biased;
                _ = self.stopped.cancelled() => return None,
                received = self.receiver.recv() => received,
            };
            match received {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Change subscriber lagged; coalescing");
                    let mut latest = None;
                    while let Ok(notification) = self.receiver.try_recv() {
                        latest = Some(notification);
                    }
                    if latest.is_some() {
                        return latest;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

async fn poll_loop(
    root: PathBuf,
    poll_interval: Duration,
    mut previous: Option<Snapshot>,
    events: broadcast::Sender<ChangeNotification>,
    cancel: CancellationToken,
    state: Arc<watch::Sender<WatchState>>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;
    let mut sequence = 0u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let path = root.clone();
        let current = match tokio::task::spawn_blocking(move || snapshot(&path)).await {
            Ok(Ok(snapshot)) => Some(snapshot),
            Ok(Err(e)) => {
                if previous.is_some() {
                    tracing::warn!(
                        root = %root.display(),
                        error = %e,
                        "Watch root became unreadable"
                    );
                }
                None
            }
            Err(e) => {
                tracing::error!(root = %root.display(), error = %e, "Snapshot task failed");
                continue;
            }
        };

        if current != previous {
            sequence += 1;
            let notification = ChangeNotification {
                sequence,
                observed_at: Utc::now(),
            };
            tracing::debug!(root = %root.display(), sequence, "Filesystem change detected");
            // No receivers is not an error: the notification is simply dropped.
            let _ = events.send(notification);
            previous = current;
        }
    }

    state.send_replace(WatchState::Stopped);
}

fn snapshot(root: &Path) -> std::io::Result<Snapshot> {
    let mut entries = HashMap::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        // Entries can vanish between read_dir and metadata.
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        entries.insert(
            entry.file_name(),
            EntryStamp {
                is_dir: metadata.is_dir(),
                len: metadata.len(),
                modified: metadata.modified().ok(),
            },
        );
    }
    Ok(entries)
}
