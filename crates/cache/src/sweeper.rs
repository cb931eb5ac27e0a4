use crate::cache::Shared;
use crate::error::{ErrorKind, Result};
use crossbeam_channel::{Sender, select};
use exn::ResultExt;
use std::sync::Weak;
use std::thread::JoinHandle;
use std::time::Duration;

/// Background thread that periodically removes expired entries.
///
/// Holds only a weak reference to the cache, so a dropped cache ends the
/// loop on the next tick even if [`stop`](Self::stop) never ran.
pub(crate) struct Sweeper {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub(crate) fn start(shared: Weak<Shared>, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let ticker = crossbeam_channel::tick(interval);
        let handle = std::thread::Builder::new()
            .name("tierkv-sweeper".to_string())
            .spawn(move || {
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            let Some(shared) = shared.upgrade() else {
                                break;
                            };
                            let removed = shared.delete_expired();
                            if removed > 0 {
                                tracing::debug!(removed, "Swept expired cache entries");
                            }
                        },
                        recv(stop_rx) -> _ => break,
                    }
                }
                tracing::trace!("Expiry sweeper stopped");
            })
            .or_raise(|| ErrorKind::Sweeper)?;
        tracing::debug!(interval_ms = interval.as_millis() as u64, "Started expiry sweeper");
        Ok(Self { stop: Some(stop_tx), handle: Some(handle) })
    }

    /// Signal the thread and wait for it. Safe to call more than once.
    pub(crate) fn stop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("Expiry sweeper panicked");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
