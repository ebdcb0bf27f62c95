use std::f32::consts::TAU;

use crate::click::ClickSpec;
use crate::dsp::filter::SVFilter;

/// Renders one [`ClickSpec`] into mono samples.
///
/// The oscillator accumulates phase so the pitch sweep stays continuous: the
/// instantaneous frequency changes every sample, the waveform never jumps.
/// Once the envelope closes the voice reports finished and outputs silence.
pub struct ClickVoice {
    spec: ClickSpec,
    filter: SVFilter,
    sample_rate: f32,
    /// Oscillator phase in cycles, wrapped to [0, 1).
    phase: f32,
    elapsed: u32,
    total: u32,
}

impl ClickVoice {
    pub fn new(spec: ClickSpec, sample_rate: f32) -> Self {
        let filter = SVFilter::new(spec.filter.filter_type, spec.filter.cutoff_hz)
            .with_resonance(spec.filter.resonance);
        Self {
            spec,
            filter,
            sample_rate,
            phase: 0.0,
            elapsed: 0,
            total: (spec.duration() * sample_rate).ceil() as u32,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.total
    }

    /// Produce the next sample.
    pub fn next_sample(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }
        let t = self.elapsed as f32 / self.sample_rate;
        self.elapsed += 1;

        let frequency = self.spec.sweep.at(t);
        self.phase = (self.phase + frequency / self.sample_rate).fract();

        let tone = (TAU * self.phase).sin() * self.spec.envelope.at(t);
        self.filter.process(tone, self.sample_rate)
    }

    /// Mix this voice into `out`, adding onto whatever is already there.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            if self.is_finished() {
                break;
            }
            *sample += self.next_sample();
        }
    }
}
