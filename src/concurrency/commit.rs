//! Background commit task

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use tracing::{debug, warn};

use crate::error::Result;

/// Periodic task that commits on a fixed interval
///
/// Owned by whoever opened the store (the engine), never by a map. Failures
/// are logged and the next tick tries again. Dropping the job stops it.
pub struct CommitJob {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CommitJob {
    /// Spawn the ticker thread running `task` every `interval`
    pub fn start<F>(interval: Duration, task: F) -> Result<Self>
    where
        F: Fn() -> Result<()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new()
            .name("towerdb-commit".to_string())
            .spawn(move || loop {
                channel::select! {
                    recv(ticker) -> _ => {
                        if let Err(e) = task() {
                            warn!(error = %e, "background commit failed");
                        }
                    }
                    recv(shutdown_rx) -> _ => break,
                }
            })?;

        debug!(interval_ms = interval.as_millis() as u64, "started commit job");
        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the ticker and wait for an in-flight commit to finish
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the channel, which wakes the select
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("commit job panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for CommitJob {
    fn drop(&mut self) {
        self.stop();
    }
}
