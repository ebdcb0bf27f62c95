//! Turns scheduled beats into audio render requests and visual pulses.
//!
//! The two output channels are deliberately independent: the audio click is
//! placed sample-accurately by the backend, while the visual pulse is
//! best-effort: it fires when the host next services the dispatcher, whose
//! cadence is bounded by the polling interval while playing.

use tracing::warn;

use crate::backend::AudioBackend;
use crate::click::ClickSpec;
use crate::scheduler::BeatEvent;

/// How long the visual pulse stays lit, in seconds.
pub const PULSE_DURATION: f64 = 0.150;

/// Fire-and-forget visual output. Implementations must not block.
pub trait VisualSink: Send {
    fn pulse_on(&mut self);
    fn pulse_off(&mut self);
}

/// A pending visual pulse: light at `on_at`, clear at `off_at`.
struct Pulse {
    on_at: f64,
    off_at: f64,
    lit: bool,
}

pub struct EventDispatcher {
    backend: Option<Box<dyn AudioBackend>>,
    visual: Box<dyn VisualSink>,
    pulses: Vec<Pulse>,
}

impl EventDispatcher {
    /// `backend: None` is the degraded visual-only mode; the caller decides
    /// whether that deserves a startup warning.
    pub fn new(backend: Option<Box<dyn AudioBackend>>, visual: Box<dyn VisualSink>) -> Self {
        Self {
            backend,
            visual,
            pulses: Vec::new(),
        }
    }

    pub fn has_audio(&self) -> bool {
        self.backend.is_some()
    }

    /// Ask the backend to start rendering. A refusal is logged and playback
    /// proceeds degraded.
    pub fn resume(&mut self) {
        if let Some(backend) = self.backend.as_mut() {
            if let Err(err) = backend.resume() {
                warn!("audio resume failed, continuing degraded: {err}");
            }
        }
    }

    /// Handle one scheduled beat: submit the sample-accurate click and queue
    /// the visual pulse. A failed click is logged and dropped; it must not
    /// halt the schedule.
    pub fn dispatch(&mut self, beat: BeatEvent, now: f64) {
        if let Some(backend) = self.backend.as_mut() {
            if let Err(err) = backend.render_click(beat.time, &ClickSpec::beat()) {
                warn!("dropping click at {:.3}s: {err}", beat.time);
            }
        }

        // Visual delay clamped to zero: a beat already due lights up now.
        let on_at = beat.time.max(now);
        self.pulses.push(Pulse {
            on_at,
            off_at: on_at + PULSE_DURATION,
            lit: false,
        });
    }

    /// Immediate tactile feedback for a tempo-dial step. Not part of the
    /// beat grid: rendered at `now`, no visual pulse.
    pub fn detent(&mut self, now: f64) {
        if let Some(backend) = self.backend.as_mut() {
            if let Err(err) = backend.render_click(now, &ClickSpec::detent()) {
                warn!("dropping detent click: {err}");
            }
        }
    }

    /// Fire any due pulse transitions. Call whenever the host wakes up.
    pub fn service(&mut self, now: f64) {
        let Self { pulses, visual, .. } = self;
        pulses.retain_mut(|pulse| {
            if !pulse.lit && now >= pulse.on_at {
                visual.pulse_on();
                pulse.lit = true;
            }
            if pulse.lit && now >= pulse.off_at {
                visual.pulse_off();
                return false;
            }
            true
        });
    }

    /// Discard queued pulses and clear anything still lit. Used on stop;
    /// already-submitted audio clicks ring out on their own.
    pub fn cancel_pending(&mut self) {
        let Self { pulses, visual, .. } = self;
        for pulse in pulses.drain(..) {
            if pulse.lit {
                visual.pulse_off();
            }
        }
    }
}
