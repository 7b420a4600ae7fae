// File: src/autosave.rs
use crate::core::ledger::Ledger;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Background thread that saves a ledger on a fixed interval whenever it has
/// unsaved answers.
///
/// Stopped by [`AutoSaver::stop`] or on drop. A failed save is logged and
/// retried on the next tick; the in-memory ledger stays authoritative.
pub struct AutoSaver {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AutoSaver {
    pub fn spawn(ledger: Arc<Ledger>, interval: Duration) -> io::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("autosave".into())
            .spawn(move || {
                info!(interval_secs = interval.as_secs(), "periodic save started");
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => match ledger.save_if_dirty() {
                            Ok(true) => debug!("periodic save done"),
                            Ok(false) => {}
                            Err(err) => warn!(error = %err, "periodic save failed"),
                        },
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("periodic save stopped");
            })?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for an in-flight save to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("periodic save thread panicked");
            }
        }
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
