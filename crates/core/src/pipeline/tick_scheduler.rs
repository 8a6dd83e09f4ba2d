use std::time::Duration;

/// Work run on every tick.
pub type TickFn = Box<dyn FnMut() + Send>;

/// Runs a callback on a fixed cadence.
///
/// This is a port (application-layer interface). Infrastructure provides
/// concrete implementations (e.g. a worker thread).
pub trait TickScheduler: Send {
    /// Starts calling `tick` every `interval`, replacing any previous
    /// schedule. The first call happens one interval after scheduling.
    fn schedule(&mut self, interval: Duration, tick: TickFn)
        -> Result<(), Box<dyn std::error::Error>>;

    /// Cancels the schedule. Once this returns, `tick` is never called
    /// again. Cancelling an idle scheduler is a no-op.
    fn cancel(&mut self);
}
