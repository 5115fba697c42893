use std::{
    sync::{atomic::{AtomicBool, Ordering}, Arc},
    time::{Duration, Instant},
};

/// Shared stop flag. Once cancelled, the scheduler never reports another tick.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Holds at most one pending tick deadline. A tick is handed out once and
/// must be rescheduled by whoever handled it, so ticks never overlap.
#[derive(Debug)]
pub struct TickScheduler {
    due: Option<Instant>,
    cancel: CancelToken,
}

impl TickScheduler {
    pub fn new(cancel: CancelToken) -> Self {
        TickScheduler { due: None, cancel }
    }

    pub fn token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn schedule(&mut self, now: Instant, after: Duration) {
        if !self.cancel.is_cancelled() {
            self.due = Some(now + after);
        }
    }

    pub fn suspend(&mut self) {
        self.due = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.due.is_some() && !self.cancel.is_cancelled()
    }

    /// How long the caller may block waiting for input. `None` when nothing
    /// is scheduled.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.due.map(|due| due.saturating_duration_since(now))
    }

    /// Consumes the pending deadline if it has been reached.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.cancel.is_cancelled() {
            self.due = None;
            return false;
        }

        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}
