//! Windowed FFT front end and in-band peak picking.
//!
//! The analyzer owns a planned forward FFT and a precomputed Hann window;
//! scratch buffers are allocated once at construction so analysis never
//! allocates.

use rustfft::num_complex::Complex;
use rustfft::{Fft as RustFft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Lowest frequency considered for note extraction (bottom of the guitar
/// band, just under low E).
pub const BAND_LOW_HZ: f32 = 80.0;

/// Highest frequency considered (covers the fretboard plus leading
/// harmonics).
pub const BAND_HIGH_HZ: f32 = 2000.0;

/// Peaks must reach this fraction of the in-band maximum.
const HEIGHT_FRACTION: f32 = 0.15;

/// Prominence must reach this fraction of the height threshold.
const PROMINENCE_FRACTION: f32 = 0.5;

/// Minimum spacing between retained peaks, in bins.
const MIN_PEAK_SPACING: usize = 3;

/// Maximum number of peaks returned per frame.
const MAX_PEAKS: usize = 8;

/// Absolute magnitude floor below which a frame is considered silent.
const SILENCE_FLOOR: f32 = 1e-6;

/// A spectral peak with its interpolated frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    pub freq_hz: f32,
    pub magnitude: f32,
}

/// Hann-windowed magnitude-spectrum analyzer with peak extraction.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RustFft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    size: usize,
    sample_rate: f32,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for windows of `size` samples (power of two).
    ///
    /// # Panics
    ///
    /// Panics if `size` is not a power of two or is below 64.
    pub fn new(size: usize, sample_rate: f32) -> Self {
        assert!(size.is_power_of_two() && size >= 64, "bad FFT size {size}");

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        // Hann window: 0.5 * (1 - cos(2*pi*n/N))
        let window = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
            .collect();

        Self {
            fft,
            window,
            scratch: vec![Complex::new(0.0, 0.0); size],
            magnitudes: vec![0.0; size / 2 + 1],
            size,
            sample_rate,
        }
    }

    /// Window size in samples.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Compute the magnitude spectrum of `input` (length must equal the
    /// analyzer size) and extract the strongest in-band peaks.
    pub fn analyze(&mut self, input: &[f32]) -> Vec<SpectralPeak> {
        debug_assert_eq!(input.len(), self.size);

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            *slot = Complex::new(input[i] * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        for (i, slot) in self.magnitudes.iter_mut().enumerate() {
            *slot = self.scratch[i].norm();
        }

        self.pick_peaks()
    }

    /// Bin index of a frequency.
    fn bin_of(&self, freq: f32) -> usize {
        (freq * self.size as f32 / self.sample_rate) as usize
    }

    fn pick_peaks(&self) -> Vec<SpectralPeak> {
        let lo = self.bin_of(BAND_LOW_HZ).max(1);
        let hi = self
            .bin_of(BAND_HIGH_HZ)
            .min(self.magnitudes.len().saturating_sub(2));
        if lo >= hi {
            return Vec::new();
        }

        let band_max = self.magnitudes[lo..=hi]
            .iter()
            .fold(0.0f32, |m, &v| m.max(v));
        if band_max < SILENCE_FLOOR {
            return Vec::new();
        }

        let height_threshold = band_max * HEIGHT_FRACTION;
        let prominence_threshold = height_threshold * PROMINENCE_FRACTION;

        let mut candidates: Vec<(usize, f32)> = Vec::new();
        for i in lo..=hi {
            let m = self.magnitudes[i];
            if m < height_threshold {
                continue;
            }
            if m <= self.magnitudes[i - 1] || m < self.magnitudes[i + 1] {
                continue;
            }
            if self.prominence(i, lo, hi) < prominence_threshold {
                continue;
            }
            candidates.push((i, m));
        }

        // Strongest first; enforce spacing, cap the count.
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        let mut kept: Vec<(usize, f32)> = Vec::new();
        for (bin, mag) in candidates {
            if kept
                .iter()
                .all(|&(b, _)| bin.abs_diff(b) >= MIN_PEAK_SPACING)
            {
                kept.push((bin, mag));
                if kept.len() == MAX_PEAKS {
                    break;
                }
            }
        }

        kept.into_iter()
            .map(|(bin, mag)| SpectralPeak {
                freq_hz: self.refine_frequency(bin),
                magnitude: mag,
            })
            .collect()
    }

    /// Prominence of the peak at `bin`: height above the deeper of the two
    /// saddles separating it from higher ground.
    fn prominence(&self, bin: usize, lo: usize, hi: usize) -> f32 {
        let height = self.magnitudes[bin];

        let mut left_base = height;
        let mut i = bin;
        while i > lo {
            i -= 1;
            let m = self.magnitudes[i];
            if m > height {
                break;
            }
            left_base = left_base.min(m);
        }

        let mut right_base = height;
        let mut i = bin;
        while i < hi {
            i += 1;
            let m = self.magnitudes[i];
            if m > height {
                break;
            }
            right_base = right_base.min(m);
        }

        height - left_base.max(right_base)
    }

    /// Parabolic interpolation around the peak bin for sub-bin frequency
    /// accuracy.
    fn refine_frequency(&self, bin: usize) -> f32 {
        let alpha = self.magnitudes[bin - 1];
        let beta = self.magnitudes[bin];
        let gamma = self.magnitudes[bin + 1];
        let denom = alpha - 2.0 * beta + gamma;
        let delta = if denom.abs() < 1e-12 {
            0.0
        } else {
            (0.5 * (alpha - gamma) / denom).clamp(-0.5, 0.5)
        };
        (bin as f32 + delta) * self.sample_rate / self.size as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_window(size: usize, sr: f32, freqs: &[(f32, f32)]) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let t = i as f32 / sr;
                freqs
                    .iter()
                    .map(|&(f, a)| a * (2.0 * PI * f * t).sin())
                    .sum()
            })
            .collect()
    }

    #[test]
    fn single_sine_yields_one_peak() {
        let sr = 48_000.0;
        let mut analyzer = SpectrumAnalyzer::new(4096, sr);
        let input = sine_window(4096, sr, &[(440.0, 1.0)]);

        let peaks = analyzer.analyze(&input);
        assert_eq!(peaks.len(), 1, "peaks: {peaks:?}");
        assert!(
            (peaks[0].freq_hz - 440.0).abs() < 6.0,
            "found {}",
            peaks[0].freq_hz
        );
    }

    #[test]
    fn triad_yields_three_peaks() {
        let sr = 48_000.0;
        let mut analyzer = SpectrumAnalyzer::new(4096, sr);
        let input = sine_window(4096, sr, &[(261.63, 1.0), (329.63, 1.0), (392.0, 1.0)]);

        let mut freqs: Vec<f32> = analyzer.analyze(&input).iter().map(|p| p.freq_hz).collect();
        freqs.sort_by(f32::total_cmp);
        assert_eq!(freqs.len(), 3, "freqs: {freqs:?}");
        for (found, expected) in freqs.iter().zip([261.63, 329.63, 392.0]) {
            assert!(
                (found - expected).abs() < 8.0,
                "peak {found} vs expected {expected}"
            );
        }
    }

    #[test]
    fn silence_yields_no_peaks() {
        let mut analyzer = SpectrumAnalyzer::new(4096, 48_000.0);
        let input = vec![0.0; 4096];
        assert!(analyzer.analyze(&input).is_empty());
    }

    #[test]
    fn out_of_band_content_is_ignored() {
        let sr = 48_000.0;
        let mut analyzer = SpectrumAnalyzer::new(4096, sr);
        // 40 Hz rumble and 5 kHz hiss, both outside the guitar band.
        let input = sine_window(4096, sr, &[(40.0, 1.0), (5000.0, 1.0)]);
        assert!(analyzer.analyze(&input).is_empty());
    }

    #[test]
    fn weak_partials_below_threshold_are_dropped() {
        let sr = 48_000.0;
        let mut analyzer = SpectrumAnalyzer::new(4096, sr);
        // Second component at 5% of the maximum, under the 15% gate.
        let input = sine_window(4096, sr, &[(440.0, 1.0), (660.0, 0.05)]);
        let peaks = analyzer.analyze(&input);
        assert_eq!(peaks.len(), 1);
    }

    #[test]
    fn at_most_eight_peaks() {
        let sr = 48_000.0;
        let mut analyzer = SpectrumAnalyzer::new(4096, sr);
        let freqs: Vec<(f32, f32)> = (0..12)
            .map(|i| (150.0 + 140.0 * i as f32, 1.0 - 0.02 * i as f32))
            .collect();
        let input = sine_window(4096, sr, &freqs);
        let peaks = analyzer.analyze(&input);
        assert!(peaks.len() <= 8, "got {} peaks", peaks.len());
        assert!(peaks.len() >= 6);
    }

    #[test]
    #[should_panic]
    fn non_power_of_two_size_panics() {
        let _ = SpectrumAnalyzer::new(1000, 48_000.0);
    }
}
