//! Stoppable background placement worker

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::queue::PlacementSender;

/// What the worker loop does after one producer step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStep {
    /// Call the producer again
    Continue,
    /// Producer has nothing more to do; exit the thread
    Finished,
}

/// Background thread running a placement producer until stopped
///
/// The run flag is checked before every producer step. Stopping (or dropping)
/// the worker clears the flag and joins the thread.
pub struct PlacementWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlacementWorker {
    /// Spawn a named worker calling `producer` until it finishes or is stopped
    pub fn spawn<F>(name: &str, sender: PlacementSender, mut producer: F) -> std::io::Result<Self>
    where
        F: FnMut(&PlacementSender) -> WorkerStep + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            while flag.load(Ordering::Acquire) {
                if producer(&sender) == WorkerStep::Finished {
                    break;
                }
            }
            flag.store(false, Ordering::Release);
        })?;
        log::debug!("Placement worker '{}' started", name);
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Whether the worker loop is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clear the run flag and wait for the thread to exit
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Placement worker panicked");
            }
        }
    }
}

impl Drop for PlacementWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
