//! Periodic stats sampling on a background thread.

use super::DB;
use crate::config::DbStats;
use crate::error::{DialError, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Handle to a running stats sampler. Stops on [`stop`](StatsMonitor::stop)
/// or drop.
#[derive(Debug)]
pub struct StatsMonitor {
    latest: Arc<RwLock<Option<DbStats>>>,
    shutdown: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StatsMonitor {
    pub(super) fn spawn(db: DB, interval: Duration) -> Result<Self> {
        let latest = Arc::new(RwLock::new(None));
        let (shutdown, rx) = mpsc::channel::<()>();
        let gauges = Arc::clone(&latest);

        let handle = std::thread::Builder::new()
            .name("dialtrack-stats".to_string())
            .spawn(move || {
                loop {
                    match db.stats() {
                        Ok(stats) => {
                            log::debug!(
                                "stats: {} entities, {} contributions, {} snapshots",
                                stats.entity_count,
                                stats.contribution_count,
                                stats.snapshot_count
                            );
                            *gauges.write() = Some(stats);
                        }
                        Err(DialError::DatabaseClosed) => break,
                        Err(e) => log::warn!("failed to sample stats: {}", e),
                    }

                    match rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("stats monitor shutting down");
            })?;

        Ok(Self {
            latest,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Most recent sample, `None` until the first one completes.
    pub fn latest(&self) -> Option<DbStats> {
        self.latest.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop sampling and wait for the thread to exit.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("stats monitor thread panicked");
            }
        }
    }
}

impl Drop for StatsMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
