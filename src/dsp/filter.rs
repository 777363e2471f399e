use std::f32::consts::{FRAC_1_SQRT_2, TAU};

use serde::{Deserialize, Serialize};

/*
| type              | constructed by       | passes          | rejects      |
| ----------------- | -------------------- | --------------- | ------------ |
| low-pass          | LPF                  | below cutoff    | above cutoff |
| high-pass         | HPF                  | above cutoff    | below cutoff |
| band-pass         | LPF ∘ HPF (series)   | between cutoffs | outside      |
| notch / band-stop | LPF + HPF (parallel) | outside         | between      |

Three filters live here:

  SVFilter    Topology-preserving state variable filter (2 poles). With
              k = √2 its low-pass output is a Butterworth response, which is
              what the master stage uses for bass enhancement. Its band-pass
              output is scaled by k so the centre frequency passes at unity;
              `set_bandwidth` picks k from a width in Hz (Q = centre / width).

  OnePole     The classic "tone" low-pass: one pole, 6 dB/octave, with the
              coefficient derived from the half-power point. It sits inside
              every reverb feedback loop.

  DcBlocker   y[n] = x[n] - x[n-1] + g·y[n-1], removes DC bias before the
              signal leaves the master stage.
*/

/// Resonance that yields `k = √2` (Q = 1/√2), i.e. a Butterworth response.
pub const BUTTERWORTH_RESONANCE: f32 = 1.0 - FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
    pub notch: f32,
}

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    pub cutoff_hz: f32,
    pub resonance: f32,
    filter_type: FilterType,
}

impl SVFilter {
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz: 1000.0,
            resonance: 0.0,
            filter_type,
        }
    }

    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            ..Self::new(FilterType::LowPass)
        }
    }

    pub fn highpass(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            ..Self::new(FilterType::HighPass)
        }
    }

    /// Second-order Butterworth low-pass (maximally flat, no peak at cutoff).
    pub fn butterworth_lowpass(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            resonance: BUTTERWORTH_RESONANCE,
            ..Self::new(FilterType::LowPass)
        }
    }

    /// Second-order Butterworth high-pass.
    pub fn butterworth_highpass(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            resonance: BUTTERWORTH_RESONANCE,
            ..Self::new(FilterType::HighPass)
        }
    }

    /// Band-pass centred on `centre_hz`, `width_hz` wide at the half-power points.
    pub fn bandpass(centre_hz: f32, width_hz: f32) -> Self {
        let mut filter = Self::new(FilterType::BandPass);
        filter.set_bandwidth(centre_hz, width_hz);
        filter
    }

    /// Move the centre and width of the pass band.
    pub fn set_bandwidth(&mut self, centre_hz: f32, width_hz: f32) {
        let centre = centre_hz.max(1.0);
        let q = centre / width_hz.max(1.0);
        self.cutoff_hz = centre;
        // k = 1 / Q
        self.resonance = 1.0 - 0.5 / q;
    }

    #[inline]
    fn compute_g(&self, sample_rate: f32) -> f32 {
        // Keep the prewarped cutoff below Nyquist so tan() stays finite
        let cutoff = self.cutoff_hz.clamp(1.0, sample_rate * 0.49);
        let wd = TAU * cutoff;
        let wa = (2.0 * sample_rate) * (wd / (2.0 * sample_rate)).tan();
        wa / (2.0 * sample_rate)
    }

    pub fn next_sample(&mut self, sample: f32, k: f32, g: f32) -> FilterOutputs {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
            notch: sample - k * v1,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        let g = self.compute_g(sample_rate);
        let k = 2.0 - (2.0 * self.resonance);

        for sample in buffer.iter_mut() {
            let outputs = self.next_sample(*sample, k, g);

            *sample = match self.filter_type {
                FilterType::LowPass => outputs.lowpass,
                FilterType::HighPass => outputs.highpass,
                FilterType::BandPass => k * outputs.bandpass,
                FilterType::Notch => outputs.notch,
            }
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff_hz = cutoff;
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance;
    }
}

/// One-pole "tone" low-pass.
///
/// `b = 2 - cos(2π·fc/sr)`, `c2 = b - √(b² - 1)`, `c1 = 1 - c2` and
/// `y[n] = c1·x[n] + c2·y[n-1]`.
#[derive(Debug, Clone)]
pub struct OnePole {
    c1: f32,
    c2: f32,
    state: f32,
}

impl OnePole {
    pub fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            c1: 1.0,
            c2: 0.0,
            state: 0.0,
        };
        filter.set_cutoff(cutoff_hz, sample_rate);
        filter
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32, sample_rate: f32) {
        let b = 2.0 - (TAU * cutoff_hz / sample_rate).cos();
        self.c2 = b - (b * b - 1.0).max(0.0).sqrt();
        self.c1 = 1.0 - self.c2;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = self.c1 * input + self.c2 * self.state;
        self.state
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

/// First-order DC blocking high-pass.
#[derive(Debug, Clone)]
pub struct DcBlocker {
    gain: f32,
    x1: f32,
    y1: f32,
}

impl DcBlocker {
    pub fn new(gain: f32) -> Self {
        Self {
            gain,
            x1: 0.0,
            y1: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = input - self.x1 + self.gain * self.y1;
        self.x1 = input;
        self.y1 = output;
        output
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}

impl Default for DcBlocker {
    fn default() -> Self {
        Self::new(0.99)
    }
}
