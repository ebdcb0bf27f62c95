use std::time::Duration;

/*
Look-Ahead Beat Scheduling
==========================

A metronome cannot fire its clicks from a timer callback directly: host
timers are coarse (milliseconds at best) and preemptible, so clicks would
jitter audibly. Instead the scheduler runs slightly *ahead* of time.

The two constants that make this work:

  SCHEDULE_AHEAD     How far past "now" beats may be pre-scheduled (0.1s).
                     Anything due inside this window is handed to the
                     dispatcher immediately, stamped with its exact time.

  LOOKAHEAD_INTERVAL How often the polling driver wakes the scheduler (25ms).

Because SCHEDULE_AHEAD > LOOKAHEAD_INTERVAL, every beat is queued with the
audio backend before it is due even when a polling wakeup lands late. The
backend's own sample clock then places the click, so the timer's jitter
never reaches the listener's ear.

The cursor arithmetic matters just as much. `next_beat_time` advances by
repeated addition of the beat interval from the last committed cursor:

    beat k = cursor + k * (60 / bpm)

an absolute grid, never "tick time + interval". A late wakeup emits several
beats in one call, each with its own correct timestamp; it never shifts the
grid. Polling jitter therefore cannot accumulate into tempo drift.
*/

/// How far past "now" beats may be pre-scheduled, in seconds.
pub const SCHEDULE_AHEAD: f64 = 0.1;

/// Polling period at which the scheduler expects to be ticked.
/// Invariant: strictly shorter than [`SCHEDULE_AHEAD`].
pub const LOOKAHEAD_INTERVAL: Duration = Duration::from_millis(25);

/// Transport state. Owned by the scheduler; its host drives transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stopped,
    Playing,
}

/// A single scheduled beat instant, in seconds on the scheduler's clock.
/// Ephemeral: consumed by the dispatcher and discarded once rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    pub time: f64,
}

/// The look-ahead scheduler.
///
/// Time is always passed in explicitly, so the scheduler itself has no clock
/// dependency and its emission grid can be tested exactly.
#[derive(Debug)]
pub struct BeatScheduler {
    transport: Transport,
    /// The next not-yet-scheduled beat instant.
    next_beat_time: f64,
}

impl BeatScheduler {
    pub fn new() -> Self {
        Self {
            transport: Transport::Stopped,
            next_beat_time: 0.0,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    /// Begin playback with the first beat due at `now`. Idempotent: calling
    /// while already playing leaves the grid untouched.
    pub fn start(&mut self, now: f64) {
        if self.is_playing() {
            return;
        }
        self.transport = Transport::Playing;
        self.next_beat_time = now;
    }

    /// Halt playback. Idempotent. The stale cursor is discarded on the next
    /// `start`.
    pub fn stop(&mut self) {
        self.transport = Transport::Stopped;
    }

    /// Re-anchor the grid after a tempo change: the next beat is one full
    /// new-tempo interval away from `now`, so nothing double-fires and the
    /// tempo never audibly "snaps" mid-beat. No-op while stopped.
    pub fn resynchronize(&mut self, now: f64, seconds_per_beat: f64) {
        if !self.is_playing() {
            return;
        }
        self.next_beat_time = now + seconds_per_beat;
    }

    /// Emit every beat due inside the schedule-ahead window and advance the
    /// cursor past it.
    ///
    /// A loop, not a single check: a polling gap (stalled thread, busy host)
    /// may leave several beats due at once, and each must go out with its
    /// own timestamp. The loop is bounded because the cursor strictly
    /// advances by a positive interval each iteration.
    pub fn tick(&mut self, now: f64, seconds_per_beat: f64, mut emit: impl FnMut(BeatEvent)) {
        if !self.is_playing() {
            return;
        }
        while self.next_beat_time < now + SCHEDULE_AHEAD {
            emit(BeatEvent {
                time: self.next_beat_time,
            });
            self.next_beat_time += seconds_per_beat;
        }
    }
}

impl Default for BeatScheduler {
    fn default() -> Self {
        Self::new()
    }
}
