// Playback clocks - monotonic "now" readings in seconds
// The scheduler never reads the system time directly; a clock is injected

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic clock capability
pub trait Clock: Send + Sync {
    /// Current reading in seconds; never decreases
    fn now(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Wall clock backed by `Instant`, zeroed at creation
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Manually driven clock for deterministic scheduling
///
/// Stores microseconds in an atomic so clones can be handed to a player
/// thread while the test advances time from outside.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock starting at the given reading
    pub fn starting_at(seconds: f64) -> Self {
        let clock = Self::new();
        clock.set(seconds);
        clock
    }

    /// Jump to an absolute reading (clamped so the clock never runs backwards)
    pub fn set(&self, seconds: f64) {
        let target = seconds_to_micros(seconds);
        self.micros.fetch_max(target, Ordering::SeqCst);
    }

    /// Move the clock forward
    pub fn advance(&self, seconds: f64) {
        self.micros
            .fetch_add(seconds_to_micros(seconds), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

fn seconds_to_micros(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1_000_000.0).round() as u64
}

/// Convert a delay in seconds into a timer duration; negative delays fire immediately
pub fn delay_to_duration(delay_seconds: f64) -> Duration {
    if delay_seconds.is_nan() || delay_seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(delay_seconds).unwrap_or(Duration::MAX)
}
