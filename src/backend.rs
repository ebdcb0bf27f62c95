//! Audio backends: sample-accurate click rendering.
//!
//! The dispatcher talks to a backend through [`AudioBackend`]: it submits a
//! click spec with an absolute onset time and never blocks on the result.
//! [`CpalBackend`] renders those requests inside the cpal output callback,
//! placing each onset on an exact output frame.

use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Producer, RingBuffer};
use tracing::{debug, warn};

use crate::click::ClickSpec;
use crate::clock::{ClockSource, SampleClock};
use crate::dsp::voice::ClickVoice;

/// Capacity of the request ring into the render callback. Deep enough for a
/// whole schedule-ahead window of beats plus detent chatter.
const CLICK_QUEUE_SIZE: usize = 64;

/// Upper bound on simultaneously sounding clicks inside the callback.
const MAX_ACTIVE_CLICKS: usize = 8;

pub trait AudioBackend {
    /// Seconds on the backend's render clock.
    fn now(&self) -> f64;

    /// Request a click whose envelope onset lands exactly at `at` seconds on
    /// the render clock. Submitting is non-blocking; a failure is transient
    /// and must not stop the caller from scheduling further beats.
    fn render_click(&mut self, at: f64, spec: &ClickSpec) -> Result<(), BackendError>;

    /// (Re)start rendering. Failure is survivable: the caller logs it and
    /// playback proceeds degraded.
    fn resume(&mut self) -> Result<(), BackendError>;
}

#[derive(Debug)]
pub enum BackendError {
    /// No usable output device or stream configuration.
    Unavailable(String),
    /// The request ring into the render thread is full.
    QueueFull,
    /// The output stream refused to start.
    Stream(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unavailable(reason) => {
                write!(f, "audio output unavailable: {reason}")
            }
            BackendError::QueueFull => write!(f, "click request queue is full"),
            BackendError::Stream(reason) => write!(f, "audio stream error: {reason}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Convert an absolute time to the output frame carrying its onset.
fn onset_frame(at: f64, sample_rate: f64) -> u64 {
    (at.max(0.0) * sample_rate).round() as u64
}

struct ClickRequest {
    start_frame: u64,
    spec: ClickSpec,
}

struct ActiveClick {
    voice: ClickVoice,
    start_frame: u64,
}

/// cpal-backed renderer on the default output device.
///
/// Not `Send`: cpal streams are tied to the thread that built them, so the
/// engine constructs its backend on its own thread.
pub struct CpalBackend {
    stream: cpal::Stream,
    requests: Producer<ClickRequest>,
    clock: SampleClock,
    sample_rate: f64,
}

impl CpalBackend {
    /// Open the default output device. `Err` is a capability statement, not
    /// a fault: the caller degrades to visual-only.
    pub fn try_new() -> Result<Self, BackendError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| BackendError::Unavailable("no default output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        let sample_rate = config.sample_rate().0 as f64;
        let channels = config.channels() as usize;
        let clock = SampleClock::new(sample_rate);

        let (requests, mut incoming) = RingBuffer::<ClickRequest>::new(CLICK_QUEUE_SIZE);

        let callback_clock = clock.clone();
        let mut active: Vec<ActiveClick> = Vec::with_capacity(MAX_ACTIVE_CLICKS);
        let mut frame_count: u64 = 0;

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| {
                    callback_clock.publish_frames(frame_count);

                    while let Ok(request) = incoming.pop() {
                        if active.len() < MAX_ACTIVE_CLICKS {
                            active.push(ActiveClick {
                                voice: ClickVoice::new(request.spec, sample_rate as f32),
                                start_frame: request.start_frame,
                            });
                        }
                    }

                    let frames = data.len() / channels;
                    for i in 0..frames {
                        let frame = frame_count + i as u64;
                        let mut sample = 0.0f32;
                        for click in active.iter_mut() {
                            if frame >= click.start_frame {
                                sample += click.voice.next_sample();
                            }
                        }
                        // Mono click to every channel
                        for channel in 0..channels {
                            data[i * channels + channel] = sample;
                        }
                    }

                    active.retain(|click| !click.voice.is_finished());
                    frame_count += frames as u64;
                },
                |err| warn!("audio stream error: {err}"),
                None,
            )
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        debug!(sample_rate, channels, "opened cpal output stream");

        Ok(Self {
            stream,
            requests,
            clock,
            sample_rate,
        })
    }

    /// Clock handle sharing this backend's frame counter.
    pub fn clock(&self) -> SampleClock {
        self.clock.clone()
    }
}

impl AudioBackend for CpalBackend {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn render_click(&mut self, at: f64, spec: &ClickSpec) -> Result<(), BackendError> {
        let request = ClickRequest {
            start_frame: onset_frame(at, self.sample_rate),
            spec: *spec,
        };
        self.requests
            .push(request)
            .map_err(|_| BackendError::QueueFull)
    }

    fn resume(&mut self) -> Result<(), BackendError> {
        self.stream
            .play()
            .map_err(|err| BackendError::Stream(err.to_string()))
    }
}
