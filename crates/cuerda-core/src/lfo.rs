//! Low-frequency sine oscillator for delay-time modulation.

use core::f32::consts::TAU;
use libm::sinf;

/// Sine LFO with phase accumulation.
///
/// Used to wobble delay times a few samples around their target, the
/// tape-style "wow" of the stereo delay. Output is in [-1, 1].
///
/// # Example
///
/// ```rust
/// use cuerda_core::Lfo;
///
/// let mut lfo = Lfo::new(48_000.0, 0.5);
/// let v = lfo.next();
/// assert!((-1.0..=1.0).contains(&v));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Phase position in [0, 1).
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
}

impl Lfo {
    /// Create an LFO at `freq_hz`.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: freq_hz / sample_rate,
            sample_rate,
        }
    }

    /// Set frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz / self.sample_rate;
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Set the phase directly (0.0 to 1.0); used to offset the two channels
    /// of a stereo pair.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.clamp(0.0, 1.0);
    }

    /// Update the sample rate, keeping the frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let freq = self.frequency();
        self.sample_rate = sample_rate;
        self.phase_inc = freq / sample_rate;
    }

    /// Rewind to phase zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Advance one sample and return the sine value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let out = sinf(self.phase * TAU);
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        out
    }
}
