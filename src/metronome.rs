//! Metronome host: the engine loop and its public handle.
//!
//! All scheduler state lives on one engine thread. Ticks from the polling
//! driver, tempo commits and transport changes from the UI all arrive as
//! messages on a single channel, so mutations are serialized by construction:
//! no lock guards the cursor against a mid-tick resynchronize.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::backend::{AudioBackend, CpalBackend};
use crate::clock::{ClockSource, WallClock};
use crate::dispatch::{EventDispatcher, VisualSink};
use crate::driver::PollingDriver;
use crate::scheduler::{BeatScheduler, LOOKAHEAD_INTERVAL};
use crate::tempo::{self, Tempo};

/// Everything the engine reacts to. The driver and the handle are both
/// producers on the same channel.
#[derive(Debug, Clone, Copy)]
enum EngineMessage {
    Tick,
    SetTempo(u32),
    Start,
    Stop,
    Detent,
    Shutdown,
}

/// Backend plus the clock beats are timed against. They must agree: a
/// backend interprets onset times on its own render clock.
pub type BackendParts = (Option<Box<dyn AudioBackend>>, Box<dyn ClockSource>);

/// Default capability detection: cpal if an output device exists, otherwise
/// visual-only on the wall clock. The downgrade is logged once.
fn default_parts() -> BackendParts {
    match CpalBackend::try_new() {
        Ok(backend) => {
            let clock = backend.clock();
            (Some(Box::new(backend)), Box::new(clock))
        }
        Err(err) => {
            warn!("no audio backend ({err}); running visual-only on the wall clock");
            (None, Box::new(WallClock::new()))
        }
    }
}

pub struct MetronomeBuilder {
    bpm: f64,
}

impl MetronomeBuilder {
    /// Initial tempo; committed through the usual clamp.
    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn build(self, visual: impl VisualSink + 'static) -> Metronome {
        Metronome::with_parts(default_parts, visual, self.bpm)
    }
}

/// Handle to a running metronome engine.
///
/// `set_tempo`, `start` and `stop` are best-effort and never return errors;
/// the handle mirrors the committed tempo and transport so reads don't
/// round-trip through the engine.
pub struct Metronome {
    messages: Sender<EngineMessage>,
    engine: Option<JoinHandle<()>>,
    bpm: u32,
    playing: bool,
}

impl Metronome {
    pub fn builder() -> MetronomeBuilder {
        MetronomeBuilder {
            bpm: tempo::DEFAULT_BPM as f64,
        }
    }

    pub fn new(visual: impl VisualSink + 'static) -> Self {
        Self::builder().build(visual)
    }

    /// Assemble a metronome from explicit parts. The factory runs on the
    /// engine thread, so backends tied to their construction thread (cpal
    /// streams) work.
    pub fn with_parts(
        parts: impl FnOnce() -> BackendParts + Send + 'static,
        visual: impl VisualSink + 'static,
        bpm: f64,
    ) -> Self {
        let initial = tempo::commit_bpm(bpm, tempo::DEFAULT_BPM);
        let (messages, message_rx) = mpsc::channel();

        let driver_tx = messages.clone();
        let engine = thread::Builder::new()
            .name("clave-engine".into())
            .spawn(move || {
                let (backend, clock) = parts();
                let driver =
                    match PollingDriver::spawn(LOOKAHEAD_INTERVAL, driver_tx, EngineMessage::Tick)
                    {
                        Ok(driver) => Some(driver),
                        Err(err) => {
                            warn!("no polling thread ({err}); degrading to same-thread cadence");
                            None
                        }
                    };
                Engine {
                    messages: message_rx,
                    clock,
                    tempo: Tempo::new(initial),
                    scheduler: BeatScheduler::new(),
                    dispatcher: EventDispatcher::new(backend, Box::new(visual)),
                    driver,
                }
                .run();
            });

        let engine = match engine {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("could not spawn metronome engine: {err}");
                None
            }
        };

        Self {
            messages,
            engine,
            bpm: initial,
            playing: false,
        }
    }

    /// Commit a requested tempo and return the stored value. While playing,
    /// a changed commit re-anchors the beat grid one new interval out.
    pub fn set_tempo(&mut self, requested: f64) -> u32 {
        let committed = tempo::commit_bpm(requested, self.bpm);
        if committed != self.bpm {
            self.bpm = committed;
            let _ = self.messages.send(EngineMessage::SetTempo(committed));
        }
        committed
    }

    pub fn tempo(&self) -> u32 {
        self.bpm
    }

    pub fn start(&mut self) {
        self.playing = true;
        let _ = self.messages.send(EngineMessage::Start);
    }

    pub fn stop(&mut self) {
        self.playing = false;
        let _ = self.messages.send(EngineMessage::Stop);
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.stop();
        } else {
            self.start();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Fire the dial-step feedback click right now, outside the beat grid.
    pub fn detent_click(&self) {
        let _ = self.messages.send(EngineMessage::Detent);
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        let _ = self.messages.send(EngineMessage::Shutdown);
        if let Some(handle) = self.engine.take() {
            let _ = handle.join();
        }
    }
}

/// Engine-thread state: the single logical actor that owns the timeline.
struct Engine {
    messages: Receiver<EngineMessage>,
    clock: Box<dyn ClockSource>,
    tempo: Tempo,
    scheduler: BeatScheduler,
    dispatcher: EventDispatcher,
    driver: Option<PollingDriver>,
}

impl Engine {
    fn run(mut self) {
        loop {
            let message = if self.driver.is_none() && self.scheduler.is_playing() {
                // Same-thread fallback: the receive timeout is the cadence.
                match self.messages.recv_timeout(LOOKAHEAD_INTERVAL) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => EngineMessage::Tick,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match self.messages.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                }
            };

            match message {
                EngineMessage::Tick => self.tick(),
                EngineMessage::SetTempo(bpm) => self.set_tempo(bpm),
                EngineMessage::Start => self.start(),
                EngineMessage::Stop => self.stop(),
                EngineMessage::Detent => {
                    let now = self.clock.now();
                    self.dispatcher.detent(now);
                }
                EngineMessage::Shutdown => break,
            }

            self.dispatcher.service(self.clock.now());
        }

        self.dispatcher.cancel_pending();
    }

    fn start(&mut self) {
        if self.scheduler.is_playing() {
            return;
        }
        self.dispatcher.resume();
        self.scheduler.start(self.clock.now());
        if let Some(driver) = &self.driver {
            driver.start();
        }
        // Schedule immediately so the first beat lands at the start() time
        // instead of one polling interval late.
        self.tick();
    }

    fn stop(&mut self) {
        if !self.scheduler.is_playing() {
            return;
        }
        self.scheduler.stop();
        if let Some(driver) = &self.driver {
            driver.stop();
        }
        self.dispatcher.cancel_pending();
    }

    fn set_tempo(&mut self, bpm: u32) {
        let previous = self.tempo.bpm();
        let committed = self.tempo.commit(bpm as f64);
        if self.scheduler.is_playing() && committed != previous {
            self.scheduler
                .resynchronize(self.clock.now(), self.tempo.seconds_per_beat());
        }
    }

    fn tick(&mut self) {
        let now = self.clock.now();
        let seconds_per_beat = self.tempo.seconds_per_beat();
        let Self {
            scheduler,
            dispatcher,
            ..
        } = self;
        scheduler.tick(now, seconds_per_beat, |beat| dispatcher.dispatch(beat, now));
    }
}
