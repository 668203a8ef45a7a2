//! Single-slot trailing-edge debounce.

use std::time::Duration;

use web_time::Instant;

use crate::platform::Subscription;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Identifies one arming of a [`DebounceSlot`]. A callback carrying an older
/// token is stale and must not render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Pending {
    token: TimerToken,
    deadline: Instant,
    /// Platform timer; dropping it cancels the callback.
    #[allow(dead_code)]
    handle: Option<Subscription>,
}

/// At most one pending deadline. Re-arming replaces the previous one.
#[derive(Debug)]
pub struct DebounceSlot {
    delay: Duration,
    generation: u64,
    pending: Option<Pending>,
}

impl Default for DebounceSlot {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl DebounceSlot {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Start (or restart) the quiet period at `now`.
    pub fn arm(&mut self, now: Instant) -> TimerToken {
        self.generation += 1;
        let token = TimerToken(self.generation);
        // Replacing drops the previous platform timer.
        self.pending = Some(Pending {
            token,
            deadline: now + self.delay,
            handle: None,
        });
        token
    }

    /// Attach the platform timer backing the current arming.
    pub fn attach(&mut self, token: TimerToken, handle: Subscription) {
        match self.pending.as_mut() {
            Some(pending) if pending.token == token => pending.handle = Some(handle),
            _ => tracing::debug!(token = token.get(), "dropping timer for stale token"),
        }
    }

    /// Cancel the pending deadline, if any.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn current_token(&self) -> Option<TimerToken> {
        self.pending.as_ref().map(|p| p.token)
    }

    /// Clear and report the deadline if it has passed at `now`.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match &self.pending {
            Some(pending) if now >= pending.deadline => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Clear and report the deadline if `token` is the current arming.
    pub fn take_token(&mut self, token: TimerToken) -> bool {
        match &self.pending {
            Some(pending) if pending.token == token => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}
