//! Mono accumulation ring for spectral analysis.
//!
//! The chord detector needs the most recent N input samples with overlap
//! between analysis frames. [`AnalysisRing`] accumulates incoming blocks in a
//! fixed circular buffer and tracks how many samples arrived since the last
//! analysis, so callers can gate work to one FFT per stride.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Fixed-capacity ring of the most recent mono samples.
///
/// Written by the audio callback one block at a time; drained by the
/// analyzer via [`latest`](Self::latest), which copies the newest `capacity`
/// samples out in chronological order. Blocks longer than the capacity keep
/// only their tail.
#[derive(Debug, Clone)]
pub struct AnalysisRing {
    buffer: Vec<f32>,
    write_pos: usize,
    /// Total samples ever pushed, saturating at the capacity for fill checks.
    filled: usize,
    since_analysis: usize,
}

impl AnalysisRing {
    /// Create a ring holding `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be > 0");
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            filled: 0,
            since_analysis: 0,
        }
    }

    /// Append a block of samples.
    #[inline]
    pub fn push_block(&mut self, block: &[f32]) {
        for &s in block {
            self.buffer[self.write_pos] = s;
            self.write_pos = (self.write_pos + 1) % self.buffer.len();
        }
        self.filled = (self.filled + block.len()).min(self.buffer.len());
        self.since_analysis = self.since_analysis.saturating_add(block.len());
    }

    /// Whether the ring has accumulated a full window.
    pub fn is_full(&self) -> bool {
        self.filled == self.buffer.len()
    }

    /// Number of valid samples currently held (saturates at capacity).
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Samples pushed since [`mark_analyzed`](Self::mark_analyzed).
    pub fn samples_since_analysis(&self) -> usize {
        self.since_analysis
    }

    /// Reset the stride counter after running an analysis frame.
    pub fn mark_analyzed(&mut self) {
        self.since_analysis = 0;
    }

    /// Copy the newest `out.len()` samples into `out`, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if `out` is longer than the ring capacity.
    pub fn latest(&self, out: &mut [f32]) {
        let len = self.buffer.len();
        assert!(out.len() <= len, "window larger than ring capacity");
        let n = out.len();
        let start = (self.write_pos + len - n) % len;
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.buffer[(start + i) % len];
        }
    }

    /// Zero the ring and all counters.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.filled = 0;
        self.since_analysis = 0;
    }

    /// Ring capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_in_order() {
        let mut ring = AnalysisRing::new(8);
        ring.push_block(&[1.0, 2.0, 3.0]);
        ring.push_block(&[4.0, 5.0]);

        let mut out = [0.0; 5];
        ring.latest(&mut out);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn wraps_and_keeps_newest() {
        let mut ring = AnalysisRing::new(4);
        ring.push_block(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let mut out = [0.0; 4];
        ring.latest(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
        assert!(ring.is_full());
    }

    #[test]
    fn stride_counter_tracks_pushes() {
        let mut ring = AnalysisRing::new(16);
        ring.push_block(&[0.0; 6]);
        assert_eq!(ring.samples_since_analysis(), 6);
        ring.mark_analyzed();
        assert_eq!(ring.samples_since_analysis(), 0);
        ring.push_block(&[0.0; 3]);
        assert_eq!(ring.samples_since_analysis(), 3);
    }

    #[test]
    fn clear_empties_everything() {
        let mut ring = AnalysisRing::new(4);
        ring.push_block(&[1.0; 4]);
        ring.clear();
        assert!(!ring.is_full());
        assert_eq!(ring.filled(), 0);
        let mut out = [9.0; 4];
        ring.latest(&mut out);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    #[should_panic]
    fn oversized_window_panics() {
        let ring = AnalysisRing::new(4);
        let mut out = [0.0; 8];
        ring.latest(&mut out);
    }
}
