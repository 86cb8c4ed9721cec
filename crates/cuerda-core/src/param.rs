//! Smoothed parameters for zipper-free changes.
//!
//! Audible parameters (delay time, gains, mix) must not jump when a control
//! surface writes a new value; an abrupt step produces a click. Every such
//! parameter is wrapped in a [`SmoothedParam`], a one-pole exponential
//! follower advanced by the audio thread.
//!
//! The engine drains its parameter bus once per block, so the follower also
//! supports advancing a whole block in one call ([`SmoothedParam::advance_block`])
//! for parameters that are only consumed at block rate.

use libm::{expf, powf};

/// One-pole exponentially smoothed parameter.
///
/// Difference equation: `y[n] = y[n-1] + coeff * (target - y[n-1])` with
/// `coeff = 1 - exp(-1 / (tau * sample_rate))` and `tau` the smoothing time
/// constant. After `5 * tau` the value has reached 99.3% of the target,
/// settled for audio purposes. Smoothing times here are sized so audible
/// parameters land within 10-30 ms.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_ms: f32,
}

impl SmoothedParam {
    /// Create a parameter pinned at `initial` with smoothing configured.
    ///
    /// A `smoothing_ms` of 0 disables smoothing (instant changes).
    pub fn new(initial: f32, sample_rate: f32, smoothing_ms: f32) -> Self {
        let mut p = Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate,
            smoothing_ms,
        };
        p.recalculate_coeff();
        p
    }

    /// Set a new target; the value glides toward it over the smoothing time.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump to `value` immediately, bypassing the smoother.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Advance the smoother by `n` samples in a single step.
    ///
    /// Equivalent to calling [`advance`](Self::advance) `n` times: the pole
    /// `(1 - coeff)` is raised to the `n`th power, so block-rate consumers
    /// converge at the same rate as sample-rate ones.
    #[inline]
    pub fn advance_block(&mut self, n: usize) -> f32 {
        if n == 0 {
            return self.current;
        }
        let pole = powf(1.0 - self.coeff, n as f32);
        self.current = self.target + (self.current - self.target) * pole;
        self.current
    }

    /// Current smoothed value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// The target being approached.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether the value has effectively reached the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// Snap the current value onto the target.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    /// Change the smoothing time constant in milliseconds.
    pub fn set_smoothing_time_ms(&mut self, ms: f32) {
        self.smoothing_ms = ms;
        self.recalculate_coeff();
    }

    /// Update the sample rate and recompute the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    fn recalculate_coeff(&mut self) {
        if self.smoothing_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_ms / 1000.0 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }
}
