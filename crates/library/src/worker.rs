// FILE: crates/library/src/worker.rs
//! Background loop: scan, process the queue, sleep

use crate::manager::LibraryManager;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Shared stop flag checked between batches and during waits
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs scan and processing cycles on a timer
pub struct Worker {
    stop: StopSignal,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}

impl Worker {
    pub fn new() -> Self {
        Self {
            stop: StopSignal::new(),
            handle: Mutex::new(None),
        }
    }

    /// Starts the loop unless it is already running
    ///
    /// Returns false if a loop was already running.
    pub fn start(&self, manager: Arc<LibraryManager>) -> bool {
        let Ok(mut handle) = self.handle.lock() else {
            return false;
        };
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        self.stop.reset();
        let stop = self.stop.clone();
        *handle = Some(tokio::spawn(async move {
            info!("Background worker started");
            while !stop.is_stopped() {
                run_cycle(&manager, &stop).await;

                let hours = manager.config().processing.scan_interval_hours;
                debug!("Worker sleeping for {} hours", hours);
                let mut left = Duration::from_secs(hours * 3600);
                let step = Duration::from_secs(1);
                while !left.is_zero() && !stop.is_stopped() {
                    let chunk = left.min(step);
                    tokio::time::sleep(chunk).await;
                    left -= chunk;
                }
            }
            info!("Background worker stopped");
        }));
        true
    }

    /// Asks the loop to stop after its current step
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .map(|h| h.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
            && !self.stop.is_stopped()
    }
}

async fn run_cycle(manager: &LibraryManager, stop: &StopSignal) {
    if !manager.config().processing.worker_enabled {
        debug!("Worker disabled in config, skipping cycle");
        return;
    }

    if let Err(e) = manager.scan().await {
        error!("Worker scan failed: {}", e);
        return;
    }

    if !manager.config().processing.auto_fix {
        return;
    }
    match manager.process_all(stop).await {
        Ok(outcome) => debug!("Worker processed {} items", outcome.processed),
        Err(e) => warn!("Worker processing failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_is_shared() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_stopped());
        signal.stop();
        assert!(clone.is_stopped());
        signal.reset();
        assert!(!clone.is_stopped());
    }

    #[test]
    fn test_new_worker_is_idle() {
        let worker = Worker::new();
        assert!(!worker.is_running());
    }
}
