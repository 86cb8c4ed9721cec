//! Resonant state variable filter.
//!
//! Topology-Preserving Transform (TPT) SVF after Zavalishin, "The Art of VA
//! Filter Design". The trapezoidal integrator discretization keeps the
//! response faithful to the analog prototype and stays stable while the
//! cutoff is swept, which matters here because the lead voice retunes the
//! filter on every note.
//!
//! Lowpass, highpass, and bandpass outputs are computed in one pass; the
//! [`Effect`] impl exposes the lowpass, the one the synth voices use.

use crate::flush_denormal;
use crate::Effect;
use core::f32::consts::PI;
use libm::tanf;

/// State variable filter (2-pole, 12 dB/oct) with resonance.
///
/// # Parameters
///
/// - `cutoff`: 20 Hz to `sample_rate * 0.49`, default 1000 Hz
/// - `resonance`: Q factor, 0.5 to 20.0, default 0.707 (Butterworth). Higher
///   Q produces a resonant peak at the cutoff.
///
/// # Example
///
/// ```rust
/// use cuerda_core::{Effect, StateVariableFilter};
///
/// let mut svf = StateVariableFilter::new(48_000.0);
/// svf.set_cutoff(1200.0);
/// svf.set_resonance(3.0);
/// let out = svf.process(0.5);
/// assert!(out.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    // Integrator states
    ic1eq: f32,
    ic2eq: f32,
    // Coefficients
    g: f32,
    k: f32,
    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(48_000.0)
    }
}

impl StateVariableFilter {
    /// Create a filter at 1 kHz cutoff, Q 0.707.
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 0.0,
            sample_rate,
            cutoff: 1000.0,
            resonance: 0.707,
        };
        svf.update_coefficients();
        svf
    }

    /// Set the cutoff frequency in Hz (clamped to 20 .. 0.49 * sample rate).
    pub fn set_cutoff(&mut self, freq_hz: f32) {
        self.cutoff = freq_hz.clamp(20.0, self.sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Current cutoff in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set the resonance (Q), clamped to 0.5 .. 20.0.
    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.clamp(0.5, 20.0);
        self.update_coefficients();
    }

    /// Current resonance (Q).
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// One sample through the filter, returning (lowpass, highpass,
    /// bandpass) together.
    #[inline]
    pub fn process_all(&mut self, input: f32) -> (f32, f32, f32) {
        let v3 = input - self.ic2eq;
        let v1 = (self.g * v3 + self.ic1eq) / (1.0 + self.g * (self.g + self.k));
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = flush_denormal(2.0 * v1 - self.ic1eq);
        self.ic2eq = flush_denormal(2.0 * v2 - self.ic2eq);

        let lp = v2;
        let bp = v1;
        let hp = input - self.k * v1 - v2;
        (lp, hp, bp)
    }

    fn update_coefficients(&mut self) {
        self.g = tanf(PI * self.cutoff / self.sample_rate);
        self.k = 1.0 / self.resonance;
    }
}

impl Effect for StateVariableFilter {
    /// Lowpass output.
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_all(input).0
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
