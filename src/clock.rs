//! Monotonic time sources for the scheduler.
//!
//! Beat instants are absolute timestamps on whichever clock the dispatcher's
//! audio backend renders against. With a backend present that is the sample
//! clock of the output stream; without one, a wall clock stands in. Swapping
//! one for the other is a capability downgrade, never an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Current time in seconds. Monotonic, non-decreasing, never blocks.
pub trait ClockSource: Send {
    fn now(&self) -> f64;
}

/// Wall-clock fallback, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for WallClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Sample-accurate clock derived from an audio callback's frame counter.
///
/// The render callback publishes the number of frames it has produced; time
/// is `frames / sample_rate`. Cloning shares the counter, so one handle can
/// live in the callback and another in the engine.
#[derive(Debug, Clone)]
pub struct SampleClock {
    frames: Arc<AtomicU64>,
    sample_rate: f64,
}

impl SampleClock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Writer side: the render callback stores its running frame count here.
    /// The counter only ever grows, which keeps `now()` monotonic.
    pub fn publish_frames(&self, frames: u64) {
        self.frames.fetch_max(frames, Ordering::Release);
    }
}

impl ClockSource for SampleClock {
    fn now(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_is_monotonic() {
        let clock = WallClock::new();
        let mut previous = clock.now();
        for _ in 0..100 {
            let now = clock.now();
            assert!(now >= previous, "wall clock went backwards");
            previous = now;
        }
    }

    #[test]
    fn sample_clock_tracks_published_frames() {
        let clock = SampleClock::new(48_000.0);
        assert_eq!(clock.now(), 0.0);

        clock.publish_frames(24_000);
        assert_eq!(clock.now(), 0.5);

        clock.publish_frames(48_000);
        assert_eq!(clock.now(), 1.0);
    }

    #[test]
    fn sample_clock_ignores_regressions() {
        let clock = SampleClock::new(48_000.0);
        clock.publish_frames(48_000);
        clock.publish_frames(100);
        assert_eq!(clock.now(), 1.0, "counter must never move backwards");
    }

    #[test]
    fn clones_share_the_counter() {
        let clock = SampleClock::new(44_100.0);
        let writer = clock.clone();
        writer.publish_frames(44_100);
        assert_eq!(clock.now(), 1.0);
    }
}
