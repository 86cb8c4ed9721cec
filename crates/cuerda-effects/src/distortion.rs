//! Feedback-path distortion with six waveshaping variants.
//!
//! Inserted into the cross-feedback path of the stereo delay, where each
//! repeat passes through the shaper and the echoes grow progressively more
//! colored. All variants are stateless except bit-crush, which carries a
//! sample-and-hold register.

use cuerda_core::Effect;
use libm::{powf, roundf, tanhf};

/// Waveshaping algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistortionKind {
    /// Tanh soft clipping, tube-like warmth.
    #[default]
    SoftClip,
    /// Hard clipping at a drive-dependent threshold.
    HardClip,
    /// Asymmetric saturation, even harmonics.
    Tube,
    /// Aggressive fuzz with a square-law harmonic term.
    Fuzz,
    /// Bit-depth quantization plus sample-and-hold rate reduction.
    BitCrush,
    /// Cubic polynomial waveshaper.
    Waveshaper,
    /// Pass-through.
    None,
}

impl DistortionKind {
    /// All selectable kinds, for control surfaces and tests.
    pub const ALL: [DistortionKind; 7] = [
        DistortionKind::SoftClip,
        DistortionKind::HardClip,
        DistortionKind::Tube,
        DistortionKind::Fuzz,
        DistortionKind::BitCrush,
        DistortionKind::Waveshaper,
        DistortionKind::None,
    ];

    /// Parse a control-surface name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "soft_clip" => DistortionKind::SoftClip,
            "hard_clip" => DistortionKind::HardClip,
            "tube" => DistortionKind::Tube,
            "fuzz" => DistortionKind::Fuzz,
            "bit_crush" => DistortionKind::BitCrush,
            "waveshaper" => DistortionKind::Waveshaper,
            "none" => DistortionKind::None,
            _ => return None,
        })
    }

    /// Control-surface name.
    pub fn name(&self) -> &'static str {
        match self {
            DistortionKind::SoftClip => "soft_clip",
            DistortionKind::HardClip => "hard_clip",
            DistortionKind::Tube => "tube",
            DistortionKind::Fuzz => "fuzz",
            DistortionKind::BitCrush => "bit_crush",
            DistortionKind::Waveshaper => "waveshaper",
            DistortionKind::None => "none",
        }
    }
}

/// Waveshaping distortion with drive and wet/dry mix.
///
/// Output is `mix * shaped + (1 - mix) * input`. Bit-crush additionally
/// quantizes to `bit_depth` bits and blends through a one-pole
/// sample-and-hold whose coefficient is `rate_reduction` (1.0 = no hold,
/// values toward 0 smear the signal across more samples).
///
/// # Example
///
/// ```rust
/// use cuerda_effects::{DistortionKind, DistortionUnit};
/// use cuerda_core::Effect;
///
/// let mut dist = DistortionUnit::new(DistortionKind::SoftClip);
/// dist.set_drive(0.5);
/// let out = dist.process(0.3);
/// assert!(out.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct DistortionUnit {
    kind: DistortionKind,
    drive: f32,
    mix: f32,
    bit_depth: u8,
    rate_reduction: f32,
    /// Sample-and-hold register for bit-crush; the only state in the unit.
    hold: f32,
}

impl Default for DistortionUnit {
    fn default() -> Self {
        Self::new(DistortionKind::SoftClip)
    }
}

impl DistortionUnit {
    /// Create a unit with drive 0.5 and full wet mix.
    pub fn new(kind: DistortionKind) -> Self {
        Self {
            kind,
            drive: 0.5,
            mix: 1.0,
            bit_depth: 8,
            rate_reduction: 0.5,
            hold: 0.0,
        }
    }

    /// Select the waveshaping algorithm.
    pub fn set_kind(&mut self, kind: DistortionKind) {
        self.kind = kind;
    }

    /// Current algorithm.
    pub fn kind(&self) -> DistortionKind {
        self.kind
    }

    /// Set drive (clamped to 0..=1).
    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.clamp(0.0, 1.0);
    }

    /// Current drive.
    pub fn drive(&self) -> f32 {
        self.drive
    }

    /// Set wet/dry mix (clamped to 0..=1).
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Current mix.
    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Configure the bit-crush stage: depth 1..=16 bits, reduction in (0, 1].
    pub fn set_bit_crush(&mut self, bit_depth: u8, rate_reduction: f32) {
        self.bit_depth = bit_depth.clamp(1, 16);
        self.rate_reduction = rate_reduction.clamp(1e-3, 1.0);
    }

    /// Apply the selected transfer function to one sample.
    #[inline]
    fn shape(&mut self, s: f32) -> f32 {
        let d = self.drive;
        match self.kind {
            DistortionKind::SoftClip => {
                let k = 1.0 + 10.0 * d;
                tanhf(s * k) / k
            }
            DistortionKind::HardClip => {
                let threshold = 1.0 - d;
                s.clamp(-threshold, threshold)
            }
            DistortionKind::Tube => {
                let k_pos = 1.0 + 5.0 * d;
                let k = if s > 0.0 { k_pos } else { 2.0 * k_pos };
                s / (1.0 + s.abs() / k)
            }
            DistortionKind::Fuzz => {
                let k = 1.0 + 20.0 * d;
                let y = if s > 0.0 { tanhf(s * k) } else { 0.5 * s * k };
                // Square-law term adds the fuzz's even harmonics; bound the
                // result so a feedback loop cannot run away.
                (y + 0.3 * y * y).clamp(-1.0, 1.0)
            }
            DistortionKind::BitCrush => {
                let levels = powf(2.0, self.bit_depth as f32) - 1.0;
                let quantized = roundf(s * levels) / levels;
                self.hold += self.rate_reduction * (quantized - self.hold);
                self.hold
            }
            DistortionKind::Waveshaper => {
                let k = 0.3 * (1.0 + 8.0 * d);
                (s + k * s * s * s).clamp(-1.0, 1.0)
            }
            DistortionKind::None => s,
        }
    }
}

impl Effect for DistortionUnit {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        if !input.is_finite() {
            return 0.0;
        }
        let shaped = self.shape(input);
        self.mix * shaped + (1.0 - self.mix) * input
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {}

    fn reset(&mut self) {
        self.hold = 0.0;
    }
}
