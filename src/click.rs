//! Declarative click render requests.
//!
//! A click is described by what it sounds like (a frequency sweep, a gain
//! envelope, a filter), not by how a backend wires its processing graph.
//! Backends turn a [`ClickSpec`] into samples; see [`crate::dsp::voice`].

use crate::dsp::filter::FilterType;

/// Exponential frequency ramp from `start_hz` to `end_hz` over `duration`
/// seconds, holding `end_hz` afterwards.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencySweep {
    pub start_hz: f32,
    pub end_hz: f32,
    pub duration: f32,
}

impl FrequencySweep {
    /// Frequency at `t` seconds into the sweep.
    ///
    /// f(t) = start * (end/start)^(t/duration), the constant-ratio curve a
    /// pitch sweep needs to sound even across octaves.
    pub fn at(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return self.start_hz;
        }
        if t >= self.duration {
            return self.end_hz;
        }
        let ratio = self.end_hz / self.start_hz;
        self.start_hz * ratio.powf(t / self.duration)
    }
}

/// Percussive amplitude envelope: a linear attack to `peak`, then an
/// exponential decay reaching `floor` at `duration`, then silence.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEnvelope {
    /// Attack length in seconds.
    pub attack: f32,
    /// Peak linear gain reached at the end of the attack.
    pub peak: f32,
    /// Residual gain at `duration`; the decay curve lands here, never on
    /// zero, because an exponential never reaches it.
    pub floor: f32,
    /// Total envelope length in seconds.
    pub duration: f32,
}

impl GainEnvelope {
    /// Gain at `t` seconds after onset.
    pub fn at(&self, t: f32) -> f32 {
        if t < 0.0 || t >= self.duration {
            return 0.0;
        }
        if t < self.attack {
            return self.peak * (t / self.attack);
        }
        let progress = (t - self.attack) / (self.duration - self.attack);
        self.peak * (self.floor / self.peak).powf(progress)
    }
}

/// Filter applied to the swept tone.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub filter_type: FilterType,
    pub cutoff_hz: f32,
    /// Resonance in the filter's 0..1 range; 0.9 corresponds to Q ≈ 5.
    pub resonance: f32,
}

/// A complete click render request: submit to an audio backend together with
/// the absolute onset time.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickSpec {
    pub sweep: FrequencySweep,
    pub envelope: GainEnvelope,
    pub filter: FilterSpec,
}

impl ClickSpec {
    /// The scheduled metronome beat: a bright tone dropping fast from 1 kHz,
    /// high-passed so the sweep's tail does not thump.
    pub fn beat() -> Self {
        Self {
            sweep: FrequencySweep {
                start_hz: 1_000.0,
                end_hz: 100.0,
                duration: 0.08,
            },
            envelope: GainEnvelope {
                attack: 0.005,
                peak: 0.2,
                floor: 0.001,
                duration: 0.08,
            },
            filter: FilterSpec {
                filter_type: FilterType::HighPass,
                cutoff_hz: 200.0,
                resonance: 0.0,
            },
        }
    }

    /// The detent click for tempo-dial feedback: shorter, softer and higher
    /// than the beat, band-passed into a "tick" rather than a "tock". Fired
    /// immediately at dispatch time as direct-manipulation feedback,
    /// not part of the beat grid.
    pub fn detent() -> Self {
        Self {
            sweep: FrequencySweep {
                start_hz: 2_000.0,
                end_hz: 500.0,
                duration: 0.02,
            },
            envelope: GainEnvelope {
                attack: 0.002,
                peak: 0.05,
                floor: 0.001,
                duration: 0.02,
            },
            filter: FilterSpec {
                filter_type: FilterType::BandPass,
                cutoff_hz: 1_500.0,
                resonance: 0.9,
            },
        }
    }

    /// Total sounding length in seconds.
    pub fn duration(&self) -> f32 {
        self.envelope.duration.max(self.sweep.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_hits_its_endpoints() {
        let sweep = ClickSpec::beat().sweep;
        assert_eq!(sweep.at(0.0), 1_000.0);
        assert_eq!(sweep.at(0.08), 100.0);
        assert_eq!(sweep.at(1.0), 100.0, "sweep holds its end value");
    }

    #[test]
    fn sweep_descends_monotonically() {
        let sweep = ClickSpec::beat().sweep;
        let mut previous = sweep.at(0.0);
        for step in 1..=80 {
            let now = sweep.at(step as f32 * 0.001);
            assert!(now <= previous, "downward sweep rose at step {step}");
            previous = now;
        }
    }

    #[test]
    fn envelope_peaks_at_end_of_attack() {
        let env = ClickSpec::beat().envelope;
        assert_eq!(env.at(0.0), 0.0);
        assert_eq!(env.at(0.005), 0.2);
        assert!(env.at(0.002) < 0.2);
        assert_eq!(env.at(0.08), 0.0, "envelope is silent past its duration");
    }

    #[test]
    fn envelope_decays_toward_floor() {
        let env = ClickSpec::beat().envelope;
        let late = env.at(0.079);
        assert!(late > 0.0 && late < 0.002, "decay should approach the floor, got {late}");
        for step in 0..80 {
            assert!(env.at(step as f32 * 0.001) <= env.peak + 1e-6);
        }
    }

    #[test]
    fn detent_is_softer_shorter_and_higher_than_the_beat() {
        let beat = ClickSpec::beat();
        let detent = ClickSpec::detent();
        assert!(detent.envelope.peak < beat.envelope.peak);
        assert!(detent.duration() < beat.duration());
        assert!(detent.sweep.start_hz > beat.sweep.start_hz);
        assert_eq!(detent.filter.filter_type, FilterType::BandPass);
        assert_eq!(beat.filter.filter_type, FilterType::HighPass);
    }
}
