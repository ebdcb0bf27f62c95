use std::f32::consts::TAU;

/*
| type              | passes          | rejects      |
| ----------------- | --------------- | ------------ |
| low-pass          | below cutoff    | above cutoff |
| high-pass         | above cutoff    | below cutoff |
| band-pass         | around cutoff   | outside      |
| notch / band-stop | outside         | around cutoff|
*/

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

/// State-variable filter in the TPT (topology-preserving transform)
/// formulation: one structure yields all four responses, and it stays
/// stable under resonance.
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    pub cutoff_hz: f32,
    /// 0.0 = gentle rolloff; approaching 1.0 = strong peak at the cutoff.
    pub resonance: f32,
    filter_type: FilterType,
}

impl SVFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            resonance: 0.0,
            filter_type,
        }
    }

    pub fn with_resonance(mut self, resonance: f32) -> Self {
        self.resonance = resonance.clamp(0.0, 0.99);
        self
    }

    /// Pre-warped integrator gain for the current cutoff.
    #[inline]
    fn compute_g(&self, sample_rate: f32) -> f32 {
        (TAU * self.cutoff_hz / (2.0 * sample_rate)).tan()
    }

    /// Filter one sample.
    pub fn process(&mut self, sample: f32, sample_rate: f32) -> f32 {
        let g = self.compute_g(sample_rate);
        let k = 2.0 - 2.0 * self.resonance;

        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match self.filter_type {
            FilterType::LowPass => v2,
            FilterType::HighPass => sample - k * v1 - v2,
            FilterType::BandPass => v1,
            FilterType::Notch => sample - k * v1,
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
