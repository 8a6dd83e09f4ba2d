use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use crate::pipeline::detect_faces_use_case::{DetectFacesUseCase, TickOutcome};
use crate::pipeline::tick_scheduler::TickScheduler;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Start/stop state machine around the periodic detection tick.
///
/// Failed ticks are logged and the schedule keeps going. A tick that fires
/// while the previous one is still running is skipped rather than queued.
pub struct DetectionLoop {
    use_case: Arc<Mutex<DetectFacesUseCase>>,
    scheduler: Box<dyn TickScheduler>,
    interval: Duration,
    state: LoopState,
}

impl DetectionLoop {
    pub fn new(
        use_case: DetectFacesUseCase,
        scheduler: Box<dyn TickScheduler>,
        interval: Duration,
    ) -> Self {
        Self {
            use_case: Arc::new(Mutex::new(use_case)),
            scheduler,
            interval,
            state: LoopState::Stopped,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.state == LoopState::Running {
            return Ok(());
        }
        let use_case = self.use_case.clone();
        self.scheduler
            .schedule(self.interval, Box::new(move || run_tick(&use_case)))?;
        self.state = LoopState::Running;
        log::info!("Detection started ({}ms interval)", self.interval.as_millis());
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.scheduler.cancel();
        self.state = LoopState::Stopped;
        log::info!("Detection stopped");
    }

    pub fn toggle(&mut self) -> Result<LoopState, Box<dyn std::error::Error>> {
        match self.state {
            LoopState::Running => self.stop(),
            LoopState::Stopped => self.start()?,
        }
        Ok(self.state)
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_tick(use_case: &Mutex<DetectFacesUseCase>) {
    let mut guard = match use_case.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::WouldBlock) => {
            log::debug!("Previous tick still running, skipping");
            return;
        }
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
    };
    match guard.execute() {
        Ok(TickOutcome::SourceNotReady) => log::debug!("Frame not ready, skipping tick"),
        Ok(TickOutcome::Published(_)) => {}
        Err(e) => log::warn!("Detection tick failed: {e}"),
    }
}
