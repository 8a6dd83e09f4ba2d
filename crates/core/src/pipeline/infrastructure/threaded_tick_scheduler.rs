use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, TryRecvError};

use crate::pipeline::tick_scheduler::{TickFn, TickScheduler};

/// Runs ticks on a dedicated worker thread.
///
/// Layout: `crossbeam tick channel → worker [tick()]`, with a stop channel
/// selected alongside. The tick channel holds at most one pending tick, so
/// ticks that come due while the worker is busy collapse into one instead
/// of piling up.
pub struct ThreadedTickScheduler {
    worker: Option<Worker>,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl ThreadedTickScheduler {
    pub fn new() -> Self {
        Self { worker: None }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Default for ThreadedTickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler for ThreadedTickScheduler {
    fn schedule(
        &mut self,
        interval: Duration,
        mut tick: TickFn,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if interval.is_zero() {
            return Err("tick interval must be greater than zero".into());
        }
        self.cancel();

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let ticker = crossbeam_channel::tick(interval);

        let handle = std::thread::Builder::new()
            .name("detection-ticker".into())
            .spawn(move || loop {
                crossbeam_channel::select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        // select! picks randomly when both are ready; a
                        // pending stop always wins.
                        if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                            break;
                        }
                        tick();
                    }
                }
            })?;

        self.worker = Some(Worker { stop_tx, handle });
        Ok(())
    }

    fn cancel(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.stop_tx.send(());
        if worker.handle.join().is_err() {
            log::warn!("Detection ticker thread panicked");
        }
    }
}

impl Drop for ThreadedTickScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
