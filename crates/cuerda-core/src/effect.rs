//! The `Effect` trait shared by all audio processors.
//!
//! Stereo-first: true stereo effects (ping-pong delay, M/S width) implement
//! [`Effect::process_stereo`]; mono processors (distortion) implement
//! [`Effect::process`] and stereo falls back to independent per-channel
//! processing. The two defaults bridge each other, so an implementor must
//! override at least one of them — overriding neither infinite-recurses.

/// Core trait for audio effects.
///
/// All methods are real-time safe: no allocation, no locking, no I/O.
pub trait Effect {
    /// Process one mono sample.
    ///
    /// Default derives mono from stereo by taking the left output of
    /// `process_stereo(input, input)`.
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    /// Process one stereo frame. This is the primary method for true stereo
    /// effects; the default processes each channel independently through
    /// [`process`](Self::process).
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        (self.process(left), self.process(right))
    }

    /// Process a stereo block in place.
    fn process_block_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        for i in 0..left.len() {
            let (l, r) = self.process_stereo(left[i], right[i]);
            left[i] = l;
            right[i] = r;
        }
    }

    /// True if the effect has cross-channel interaction.
    fn is_true_stereo(&self) -> bool {
        false
    }

    /// Recalculate sample-rate-dependent coefficients.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear internal state without touching parameters.
    fn reset(&mut self);
}
