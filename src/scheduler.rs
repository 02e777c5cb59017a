//! Decision-loop timers.
//!
//! Two independent clocks drive the [`ControlEngine`](crate::app::service::ControlEngine):
//!
//! ```text
//!  change signal ──▶ Debouncer (quiet timer, reset on every signal) ──▶ recompute
//!                    Heartbeat (fixed period, never reset)          ──▶ republish
//! ```
//!
//! Both are pure state machines over an injected `Instant`, so the engine
//! and its tests decide what "now" is.

use std::time::{Duration, Instant};

/// Stand-in for "never" when a deadline would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 86_400);

/// `now + delay`, saturating to a far-future instant instead of panicking.
fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Quiet timer: fires once, `quiet` after the most recent trigger.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// (Re)arm the timer from `now`.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(deadline_after(now, self.quiet));
    }

    /// Returns `true` exactly once per armed period, when the deadline has
    /// passed.  Disarms on fire.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Fixed-period ticker.  Missed ticks are skipped, not replayed.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    period: Duration,
    next: Instant,
}

impl Heartbeat {
    /// First tick one period after `start`.
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next: deadline_after(start, period),
        }
    }

    /// Returns `true` if a tick is due at `now`, advancing past `now`.
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        while self.next <= now {
            let next = deadline_after(self.next, self.period);
            if next <= self.next {
                self.next = deadline_after(now, FAR_FUTURE);
                break;
            }
            self.next = next;
        }
        true
    }

    pub fn next(&self) -> Instant {
        self.next
    }
}
