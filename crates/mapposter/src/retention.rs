//! Periodic purge of old job records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::TimeDelta;
use tokio::sync::{broadcast, Notify};

use crate::jobs::JobStore;

/// Deletes records older than `max_age` every `interval`, regardless of
/// their status. A manual sweep can be requested through the trigger
/// channel passed to [`RetentionSweeper::start`].
pub struct RetentionSweeper {
    store: JobStore,
    max_age: TimeDelta,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl RetentionSweeper {
    pub fn new(store: JobStore, max_age: TimeDelta, interval: Duration) -> Self {
        Self {
            store,
            max_age,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Start the sweep loop in a background thread.
    pub fn start(&self, mut trigger_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let store = self.store.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let wake = Arc::clone(&self.wake);
        let interval = self.interval;
        let max_age = self.max_age;

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Retention sweeper could not start its runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                let mut interval_timer = tokio::time::interval(interval);
                interval_timer.tick().await; // skip immediate first tick

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    tokio::select! {
                        _ = interval_timer.tick() => {},
                        Ok(()) = trigger_rx.recv() => {
                            log::info!("Manual retention sweep triggered");
                        },
                        _ = wake.notified() => {},
                    }

                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    match store.purge_older_than(max_age) {
                        Ok(0) => log::debug!("Retention sweep: nothing to purge"),
                        Ok(count) => log::info!("Retention sweep purged {} job(s)", count),
                        Err(e) => log::error!("Retention sweep failed: {}", e),
                    }
                }
            });
        })
    }

    /// Signals the sweeper to stop and wakes it if it is waiting.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        // Stores a permit when the loop is not parked in select yet.
        self.wake.notify_one();
    }
}
