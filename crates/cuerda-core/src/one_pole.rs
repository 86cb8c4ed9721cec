//! One-pole lowpass filter.
//!
//! The simplest IIR lowpass, 6 dB/octave:
//!
//! ```text
//! y[n] = x[n] + coeff * (y[n-1] - x[n]),   coeff = exp(-2π·freq/sr)
//! ```
//!
//! Used to darken the delay feedback path: each repeat loses a little
//! high-frequency content, the way tape and bucket-brigade delays do.

use crate::flush_denormal;
use libm::expf;

/// One-pole (6 dB/oct) lowpass.
///
/// At `freq` near Nyquist the filter is effectively a wire; at low cutoffs
/// it rolls off aggressively. State is flushed below 1e-20 so denormals
/// never circulate in feedback loops.
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    sample_rate: f32,
    freq: f32,
}

impl OnePole {
    /// Create a lowpass with the given cutoff.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            coeff: 0.0,
            sample_rate,
            freq: freq_hz,
        };
        filter.recalculate();
        filter
    }

    /// Change the cutoff frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.freq = freq_hz;
        self.recalculate();
    }

    /// Current cutoff in Hz.
    pub fn frequency(&self) -> f32 {
        self.freq
    }

    /// Update the sample rate, keeping the cutoff.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        self.state
    }

    /// Zero the filter memory.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    fn recalculate(&mut self) {
        self.coeff = expf(-core::f32::consts::TAU * self.freq / self.sample_rate);
    }
}
