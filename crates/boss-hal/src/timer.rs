//! Stopwatch over an injectable [`Clock`].

use std::sync::Arc;
use std::time::Duration;

use boss_types::Clock;

/// Accumulating stopwatch.
///
/// Elapsed time keeps accumulating across `stop`/`start` pairs until
/// [`Timer::reset`] is called.
#[derive(Clone)]
pub struct Timer {
    clock: Arc<dyn Clock>,
    accumulated: Duration,
    started_at: Option<Duration>,
}

impl Timer {
    /// Create a stopped timer reading zero.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            accumulated: Duration::ZERO,
            started_at: None,
        }
    }

    /// Start counting.  No-op if already running.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(self.clock.now());
        }
    }

    /// Stop counting, keeping the elapsed time.
    pub fn stop(&mut self) {
        if let Some(start) = self.started_at.take() {
            self.accumulated += self.clock.now().saturating_sub(start);
        }
    }

    /// Zero the elapsed time.  A running timer keeps running.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        if self.started_at.is_some() {
            self.started_at = Some(self.clock.now());
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Elapsed time in seconds.
    pub fn get(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn elapsed(&self) -> Duration {
        let running = self
            .started_at
            .map(|start| self.clock.now().saturating_sub(start))
            .unwrap_or(Duration::ZERO);
        self.accumulated + running
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("elapsed", &self.elapsed())
            .field("running", &self.is_running())
            .finish()
    }
}
