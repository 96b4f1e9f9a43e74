//! Clock abstraction for deterministic testing.
//!
//! Production code uses `SystemClock` (real time).
//! Tests use `TestClock` with manual time advancement.
//! `Stopwatch` measures collection deadlines on top of either.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Trait abstracting time sources for testability.
pub trait Clock: Send + Sync {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock with manually controlled time.
#[derive(Debug)]
pub struct TestClock {
    instant: Mutex<Instant>,
}

impl TestClock {
    /// Create a test clock starting at the current real time.
    pub fn new() -> Self {
        Self {
            instant: Mutex::new(Instant::now()),
        }
    }

    /// Advance time by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.instant.lock() += duration;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.instant.lock()
    }
}

// ── Stopwatch ───────────────────────────────────────────────

/// Accumulating stopwatch driven by a [`Clock`].
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl Stopwatch {
    /// A stopped stopwatch reading zero.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            started_at: None,
            accumulated: Duration::ZERO,
        }
    }

    /// Start (or resume) timing. No-op if already running.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(self.clock.now());
        }
    }

    /// Stop timing and return the total elapsed time.
    pub fn stop(&mut self) -> Duration {
        if let Some(started) = self.started_at.take() {
            self.accumulated += self.clock.now().saturating_duration_since(started);
        }
        self.accumulated
    }

    /// Stop and zero the stopwatch.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(started) => {
                self.accumulated + self.clock.now().saturating_duration_since(started)
            }
            None => self.accumulated,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl std::fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stopwatch")
            .field("running", &self.is_running())
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let now = clock.now();
        assert!(clock.now() >= now);
    }

    #[test]
    fn test_test_clock_advance() {
        let clock = TestClock::new();
        let t0 = clock.now();

        clock.advance(Duration::from_secs(5));

        assert_eq!(clock.now() - t0, Duration::from_secs(5));
    }

    #[test]
    fn test_clock_trait_object() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let _ = clock.now();

        let test_clock: Arc<dyn Clock> = Arc::new(TestClock::new());
        let t = test_clock.now();
        assert_eq!(test_clock.now(), t);
    }

    #[test]
    fn test_stopwatch_starts_stopped() {
        let sw = Stopwatch::new(Arc::new(TestClock::new()));
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_stopwatch_measures_running_time() {
        let clock = Arc::new(TestClock::new());
        let mut sw = Stopwatch::new(clock.clone());
        sw.start();
        clock.advance(Duration::from_millis(250));
        assert_eq!(sw.elapsed_ms(), 250);
        assert!(sw.is_running());
    }

    #[test]
    fn test_stopwatch_stop_freezes_and_resume_accumulates() {
        let clock = Arc::new(TestClock::new());
        let mut sw = Stopwatch::new(clock.clone());
        sw.start();
        clock.advance(Duration::from_millis(100));
        assert_eq!(sw.stop(), Duration::from_millis(100));

        clock.advance(Duration::from_millis(500));
        assert_eq!(sw.elapsed_ms(), 100);

        sw.start();
        clock.advance(Duration::from_millis(40));
        assert_eq!(sw.elapsed_ms(), 140);
    }

    #[test]
    fn test_stopwatch_reset() {
        let clock = Arc::new(TestClock::new());
        let mut sw = Stopwatch::new(clock.clone());
        sw.start();
        clock.advance(Duration::from_secs(2));
        sw.reset();
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed(), Duration::ZERO);

        sw.start();
        clock.advance(Duration::from_millis(10));
        assert_eq!(sw.elapsed_ms(), 10);
    }
}
