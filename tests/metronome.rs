//! End-to-end tests driving a real engine with a capturing backend.
//!
//! Wall-clock sleeps only bound how many beats we see; the beat *times* are
//! asserted exactly, because the scheduler emits an absolute grid no matter
//! how the polling jitters.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use clave::backend::{AudioBackend, BackendError};
use clave::click::ClickSpec;
use clave::clock::{ClockSource, WallClock};
use clave::dispatch::VisualSink;
use clave::metronome::Metronome;

/// Records every render request instead of making sound.
struct CapturingBackend {
    clock: WallClock,
    clicks: Arc<Mutex<Vec<(f64, ClickSpec)>>>,
}

impl AudioBackend for CapturingBackend {
    fn now(&self) -> f64 {
        self.clock.now()
    }
    fn render_click(&mut self, at: f64, spec: &ClickSpec) -> Result<(), BackendError> {
        self.clicks.lock().unwrap().push((at, *spec));
        Ok(())
    }
    fn resume(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

struct NullVisual;

impl VisualSink for NullVisual {
    fn pulse_on(&mut self) {}
    fn pulse_off(&mut self) {}
}

/// A metronome on a shared wall clock; the test keeps a copy of the clock so
/// it can read the same timeline the engine schedules on.
fn capturing_metronome(
    bpm: f64,
) -> (Metronome, Arc<Mutex<Vec<(f64, ClickSpec)>>>, WallClock) {
    let clicks = Arc::new(Mutex::new(Vec::new()));
    let captured = clicks.clone();
    let clock = WallClock::new();
    let metronome = Metronome::with_parts(
        move || {
            (
                Some(Box::new(CapturingBackend {
                    clock,
                    clicks: captured,
                })),
                Box::new(clock),
            )
        },
        NullVisual,
        bpm,
    );
    (metronome, clicks, clock)
}

#[test]
fn emits_an_exact_half_second_grid_at_120_bpm() {
    let (mut metronome, clicks, _clock) = capturing_metronome(120.0);

    metronome.start();
    thread::sleep(Duration::from_millis(1200));
    metronome.stop();
    thread::sleep(Duration::from_millis(60));

    let seen = clicks.lock().unwrap();
    let times: Vec<f64> = seen.iter().map(|(at, _)| *at).collect();

    // ~1.2s plus the 0.1s window at 0.5s intervals: 3 beats, one or two more
    // if the sleeps overshoot.
    assert!(
        (3..=5).contains(&times.len()),
        "expected 3-5 beats, saw {times:?}"
    );
    for pair in times.windows(2) {
        assert!(
            (pair[1] - pair[0] - 0.5).abs() < 1e-9,
            "grid drifted: {pair:?}"
        );
    }
    for (_, spec) in seen.iter() {
        assert_eq!(*spec, ClickSpec::beat());
    }
}

#[test]
fn first_beat_lands_at_the_start_time() {
    let (mut metronome, clicks, clock) = capturing_metronome(120.0);

    let started_at = clock.now();
    metronome.start();
    thread::sleep(Duration::from_millis(100));
    metronome.stop();
    thread::sleep(Duration::from_millis(60));

    let seen = clicks.lock().unwrap();
    assert!(!seen.is_empty(), "start() should schedule a beat immediately");
    let slack = seen[0].0 - started_at;
    assert!(
        (0.0..0.15).contains(&slack),
        "first beat should land at start time, was {slack:.3}s after it"
    );
}

#[test]
fn restart_reanchors_the_grid() {
    let (mut metronome, clicks, clock) = capturing_metronome(240.0);

    metronome.start();
    thread::sleep(Duration::from_millis(300));
    metronome.stop();
    thread::sleep(Duration::from_millis(200));
    clicks.lock().unwrap().clear();

    let restarted_at = clock.now();
    metronome.start();
    thread::sleep(Duration::from_millis(100));
    metronome.stop();
    thread::sleep(Duration::from_millis(60));

    let seen = clicks.lock().unwrap();
    assert!(!seen.is_empty(), "restart should schedule fresh beats");
    let slack = seen[0].0 - restarted_at;
    assert!(
        (0.0..0.15).contains(&slack),
        "first beat after restart must anchor at the restart time, not a stale cursor; was {slack:.3}s after it"
    );
}

#[test]
fn set_tempo_returns_the_committed_value() {
    let (mut metronome, _clicks, _clock) = capturing_metronome(300.0);

    assert_eq!(metronome.tempo(), 240, "builder bpm is committed through the clamp");
    assert_eq!(metronome.set_tempo(10.0), 60);
    assert_eq!(metronome.set_tempo(127.8), 128);
    assert_eq!(metronome.set_tempo(f64::NAN), 128, "non-finite input keeps the current tempo");
    assert_eq!(metronome.tempo(), 128);
}

#[test]
fn tempo_change_while_playing_respaces_the_grid() {
    let (mut metronome, clicks, clock) = capturing_metronome(60.0);

    metronome.start();
    thread::sleep(Duration::from_millis(50));
    let changed_at = clock.now();
    metronome.set_tempo(240.0);
    thread::sleep(Duration::from_millis(700));
    metronome.stop();
    thread::sleep(Duration::from_millis(60));

    let seen = clicks.lock().unwrap();
    let times: Vec<f64> = seen.iter().map(|(at, _)| *at).collect();
    assert!(times.len() >= 3, "expected post-change beats, saw {times:?}");

    // The first beat of the new grid sits one full new-tempo interval after
    // the change landed, and everything after is spaced by exactly 0.25s.
    let first_new = times[1];
    assert!(
        first_new - changed_at >= 0.25 - 1e-9,
        "no beat may fire inside one new interval of the change; got {:.3}s",
        first_new - changed_at
    );
    assert!(
        first_new - changed_at < 0.25 + 0.15,
        "next beat should be one new interval after the change, was {:.3}s",
        first_new - changed_at
    );
    for pair in times[1..].windows(2) {
        assert!(
            (pair[1] - pair[0] - 0.25).abs() < 1e-9,
            "new grid should be 0.25s apart: {pair:?}"
        );
    }
}

#[test]
fn visual_pulse_reaches_the_sink() {
    struct FlagVisual(Arc<Mutex<Vec<bool>>>);
    impl VisualSink for FlagVisual {
        fn pulse_on(&mut self) {
            self.0.lock().unwrap().push(true);
        }
        fn pulse_off(&mut self) {
            self.0.lock().unwrap().push(false);
        }
    }

    let transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = FlagVisual(transitions.clone());
    let clock = WallClock::new();
    let mut metronome = Metronome::with_parts(move || (None, Box::new(clock)), sink, 120.0);

    metronome.start();
    thread::sleep(Duration::from_millis(700));
    metronome.stop();
    thread::sleep(Duration::from_millis(60));

    let seen = transitions.lock().unwrap();
    assert!(
        seen.iter().filter(|&&on| on).count() >= 1,
        "visual-only mode must still pulse"
    );
    assert_eq!(
        seen.last(),
        Some(&false),
        "stop must leave the pulse cleared"
    );
}

#[test]
fn detent_click_is_immediate_and_distinct() {
    let (metronome, clicks, _clock) = capturing_metronome(120.0);

    metronome.detent_click();
    thread::sleep(Duration::from_millis(60));

    let seen = clicks.lock().unwrap();
    assert_eq!(seen.len(), 1, "detent fires without the transport running");
    assert_eq!(seen[0].1, ClickSpec::detent());
}
