//! [`Watchdog`] – control-loop deadline monitor.
//!
//! The control loop calls [`Watchdog::feed`] between each major step of a
//! tick.  If more than the expiration period passes without a feed, the
//! watchdog reports [`WatchdogStatus::Expired`] and the owner is required
//! to stop every actuator before feeding it again.
//!
//! Time is read through a [`Clock`] so deadlines are testable without
//! sleeping.

use std::sync::Arc;
use std::time::Duration;

use boss_types::Clock;
use tracing::debug;

/// Expiration used by the robot unless configured otherwise.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_millis(250);

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// State reported by [`Watchdog::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogStatus {
    /// Fed within the expiration period.
    Alive,
    /// The deadline was missed; outputs must be forced to zero.
    Expired,
    /// Deadline checking is switched off (autonomous mode, startup).
    Disabled,
}

// ────────────────────────────────────────────────────────────────────────────
// Watchdog
// ────────────────────────────────────────────────────────────────────────────

/// Deadline that the control loop must keep meeting.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use boss_kernel::watchdog::{Watchdog, WatchdogStatus};
/// use boss_types::ManualClock;
///
/// let clock = Arc::new(ManualClock::new());
/// let mut wd = Watchdog::new(clock.clone(), Duration::from_millis(250));
/// wd.set_enabled(true);
/// wd.feed();
///
/// clock.advance(Duration::from_millis(300));
/// assert_eq!(wd.status(), WatchdogStatus::Expired);
/// ```
pub struct Watchdog {
    clock: Arc<dyn Clock>,
    expiration: Duration,
    enabled: bool,
    last_feed: Duration,
}

impl Watchdog {
    /// Create a disabled watchdog with the given expiration period.
    pub fn new(clock: Arc<dyn Clock>, expiration: Duration) -> Self {
        let last_feed = clock.now();
        Self {
            clock,
            expiration,
            enabled: false,
            last_feed,
        }
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    pub fn set_expiration(&mut self, expiration: Duration) {
        self.expiration = expiration;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch deadline checking on or off.  Enabling a disabled watchdog
    /// counts as a feed.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.last_feed = self.clock.now();
        }
        if enabled != self.enabled {
            debug!(enabled, "watchdog enable changed");
        }
        self.enabled = enabled;
    }

    /// Restart the deadline.
    pub fn feed(&mut self) {
        self.last_feed = self.clock.now();
    }

    /// Time since the last feed.
    pub fn since_feed(&self) -> Duration {
        self.clock.now().saturating_sub(self.last_feed)
    }

    pub fn status(&self) -> WatchdogStatus {
        if !self.enabled {
            WatchdogStatus::Disabled
        } else if self.since_feed() > self.expiration {
            WatchdogStatus::Expired
        } else {
            WatchdogStatus::Alive
        }
    }

    /// `true` when enabled and past the deadline.
    pub fn is_expired(&self) -> bool {
        self.status() == WatchdogStatus::Expired
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("expiration", &self.expiration)
            .field("enabled", &self.enabled)
            .field("since_feed", &self.since_feed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boss_types::ManualClock;

    fn watchdog(ms: u64) -> (Arc<ManualClock>, Watchdog) {
        let clock = Arc::new(ManualClock::new());
        let mut wd = Watchdog::new(clock.clone(), Duration::from_millis(ms));
        wd.set_enabled(true);
        (clock, wd)
    }

    #[test]
    fn fresh_watchdog_is_alive() {
        let (_clock, wd) = watchdog(250);
        assert_eq!(wd.status(), WatchdogStatus::Alive);
    }

    #[test]
    fn feed_resets_deadline() {
        let (clock, mut wd) = watchdog(20);
        clock.advance(Duration::from_millis(15));
        wd.feed();
        clock.advance(Duration::from_millis(15));
        assert_eq!(wd.status(), WatchdogStatus::Alive);
    }

    #[test]
    fn silent_loop_expires() {
        let (clock, wd) = watchdog(20);
        clock.advance(Duration::from_millis(21));
        assert!(wd.is_expired());
    }

    #[test]
    fn disabled_never_expires() {
        let (clock, mut wd) = watchdog(20);
        wd.set_enabled(false);
        clock.advance(Duration::from_secs(10));
        assert_eq!(wd.status(), WatchdogStatus::Disabled);
        assert!(!wd.is_expired());
    }

    #[test]
    fn re_enabling_counts_as_feed() {
        let (clock, mut wd) = watchdog(20);
        wd.set_enabled(false);
        clock.advance(Duration::from_secs(1));
        wd.set_enabled(true);
        assert_eq!(wd.status(), WatchdogStatus::Alive);
    }

    #[test]
    fn expiration_is_adjustable() {
        let (clock, mut wd) = watchdog(20);
        wd.set_expiration(Duration::from_millis(100));
        clock.advance(Duration::from_millis(50));
        assert_eq!(wd.status(), WatchdogStatus::Alive);
        assert_eq!(wd.expiration(), Duration::from_millis(100));
    }
}
