use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::AssetDesk;

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeProfile {
    pub logical_cores: usize,
    pub worker_threads: usize,
}

impl RuntimeProfile {
    /// Sizes the tokio worker pool. The desk is lock-bound and mostly idle in
    /// simulated delays, so a handful of workers is enough even on big hosts.
    pub fn detect() -> Self {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);

        if cores <= 1 {
            warn!(cores, "single core host, running with 2 workers");
            return Self { logical_cores: cores, worker_threads: 2 };
        }

        Self {
            logical_cores: cores,
            worker_threads: cores.min(8),
        }
    }
}

/// Handle to the background autosave thread.
#[derive(Debug)]
pub struct Autosave {
    stop: mpsc::Sender<()>,
    thread: thread::JoinHandle<()>,
}

impl Autosave {
    /// Signals the thread and waits for it, so no autosave is in flight when
    /// this returns.
    pub fn stop(self) {
        let _ = self.stop.send(());
        if self.thread.join().is_err() {
            error!("autosave thread panicked");
        }
    }
}

/// Starts the background autosave thread. Writes a snapshot of `desk` to
/// `path` every `interval` until [`Autosave::stop`] is called.
pub fn start_autosave_thread(desk: Arc<AssetDesk>, path: PathBuf, interval: Duration) -> Autosave {
    let (stop, stopped) = mpsc::channel::<()>();
    let thread = thread::spawn(move || {
        info!(path = %path.display(), every = ?interval, "autosave thread started");
        loop {
            match stopped.recv_timeout(interval) {
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }

            match desk.save(&path) {
                Ok(()) => info!(path = %path.display(), "autosaved"),
                Err(e) => error!(path = %path.display(), error = %e, "autosave failed"),
            }
        }
        info!(path = %path.display(), "autosave thread stopped");
    });
    Autosave { stop, thread }
}
