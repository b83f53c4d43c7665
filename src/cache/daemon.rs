// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Background thread periodically purging expired cache entries.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::CacheManager;

/// Runs [CacheManager::cleanup] at a fixed interval on a separate thread.
///
/// The daemon is stopped by calling [CleanupDaemon::shutdown] or by dropping it.
#[derive(Debug)]
pub struct CleanupDaemon {
    thread_handle: Option<JoinHandle<()>>,
    shutdown: Option<mpsc::Sender<()>>,
}

impl CleanupDaemon {
    /// Starts a new cleanup daemon.
    pub fn start(cache: Arc<CacheManager>, interval: Duration) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<()>();

        let thread_handle = thread::Builder::new()
            .name("cache-cleanup".to_string())
            .spawn(move || Self::run_loop(&cache, interval, rx))?;

        log::info!("cache cleanup daemon started (interval: {}s)", interval.as_secs());

        Ok(Self {
            thread_handle: Some(thread_handle),
            shutdown: Some(tx),
        })
    }

    fn run_loop(cache: &CacheManager, interval: Duration, shutdown: mpsc::Receiver<()>) {
        loop {
            match shutdown.recv_timeout(interval) {
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    let removed = cache.cleanup();
                    log::debug!(
                        "cache cleanup completed: {} expired entries removed, {}",
                        removed,
                        cache.stats(),
                    );
                }
                // Explicit shutdown, or the daemon handle was dropped
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        log::debug!("cache cleanup daemon stopped");
    }

    /// Stops the daemon and waits for its thread to finish.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            _ = tx.send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("cache cleanup daemon thread panicked: {e:?}");
            }
        }
    }

    /// Checks if the daemon is still running.
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for CleanupDaemon {
    fn drop(&mut self) {
        self.shutdown();
    }
}
