//! Reference-counted watches shared per root directory
//!
//! Every subscriber to the same root shares one [`WatchHandle`]. The watch is
//! started by the first [`WatchHub::acquire`] and stopped when the last
//! [`WatchLease`] for that root is released.

use crate::watch::service::{ChangeEvents, WatchHandle, WatchService, WatchStartError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct HubEntry {
    handle: Arc<WatchHandle>,
    subscribers: usize,
}

#[derive(Debug)]
pub struct WatchHub {
    service: WatchService,
    entries: Mutex<HashMap<PathBuf, HubEntry>>,
}

impl WatchHub {
    pub fn new(service: WatchService) -> Arc<Self> {
        Arc::new(Self {
            service,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Takes a reference on the watch for `root`, starting it if needed
    ///
    /// `root` is canonicalized, so different spellings of the same directory
    /// share one watch. A start failure affects only this root.
    ///
    /// Canonicalizing and starting touch the filesystem, so async callers
    /// should run this on a blocking thread. Neither happens under the lock.
    pub fn acquire(
        self: &Arc<Self>,
        root: impl AsRef<Path>,
    ) -> Result<WatchLease, WatchStartError> {
        let root = canonical_root(root.as_ref())?;

        if let Some(handle) = self.join(&root) {
            return Ok(self.lease(root, handle));
        }

        let started = Arc::new(self.service.start(root.clone())?);

        let mut entries = self.lock();
        let handle = match entries.get_mut(&root) {
            // Another caller started this root while we were starting ours;
            // dropping `started` stops the duplicate.
            Some(entry) => {
                entry.subscribers += 1;
                Arc::clone(&entry.handle)
            }
            None => {
                entries.insert(
                    root.clone(),
                    HubEntry {
                        handle: Arc::clone(&started),
                        subscribers: 1,
                    },
                );
                started
            }
        };
        drop(entries);

        Ok(self.lease(root, handle))
    }

    fn join(&self, root: &Path) -> Option<Arc<WatchHandle>> {
        let mut entries = self.lock();
        let entry = entries.get_mut(root)?;
        entry.subscribers += 1;
        tracing::debug!(
            root = %root.display(),
            subscribers = entry.subscribers,
            "Joined shared filesystem watch"
        );
        Some(Arc::clone(&entry.handle))
    }

    fn lease(self: &Arc<Self>, root: PathBuf, handle: Arc<WatchHandle>) -> WatchLease {
        WatchLease {
            hub: Arc::clone(self),
            root,
            handle: Some(handle),
        }
    }

    /// Live subscribers for `root`, zero when it is not watched
    pub fn subscriber_count(&self, root: impl AsRef<Path>) -> usize {
        let Ok(root) = canonical_root(root.as_ref()) else {
            return 0;
        };
        self.lock()
            .get(&root)
            .map(|entry| entry.subscribers)
            .unwrap_or(0)
    }

    pub fn active_roots(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    fn release(&self, root: &Path) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(root) else {
            return;
        };

        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            tracing::debug!(
                root = %root.display(),
                subscribers = entry.subscribers,
                "Left shared filesystem watch"
            );
            return;
        }

        if let Some(entry) = entries.remove(root) {
            tracing::debug!(root = %root.display(), "Last subscriber left; stopping watch");
            entry.handle.stop();
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, HubEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf, WatchStartError> {
    std::fs::canonicalize(root).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            WatchStartError::NotFound(root.to_path_buf())
        } else {
            WatchStartError::Io {
                path: root.to_path_buf(),
                source,
            }
        }
    })
}

/// One subscriber's reference on a shared watch
///
/// Releasing (explicitly or by drop) decrements the root's reference count.
#[derive(Debug)]
pub struct WatchLease {
    hub: Arc<WatchHub>,
    root: PathBuf,
    handle: Option<Arc<WatchHandle>>,
}

impl WatchLease {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Notifications from now on; `None` after release
    pub fn subscribe(&self) -> Option<ChangeEvents> {
        self.handle.as_ref().map(|handle| handle.subscribe())
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// Gives the reference back; idempotent
    pub fn release(&mut self) {
        if self.handle.take().is_some() {
            self.hub.release(&self.root);
        }
    }
}

impl Drop for WatchLease {
    fn drop(&mut self) {
        self.release();
    }
}
