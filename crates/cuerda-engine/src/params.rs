//! Lock-free parameter bus between control collaborators and the DSP.
//!
//! One atomic cell per parameter: f32 payloads stored as `AtomicU32` bit
//! patterns, booleans as 0/1, enums as discriminant indices. Control threads
//! publish target values through [`ParamBus::set`], which validates the
//! domain at the boundary; the audio thread reads everything once per block.
//! A generation counter lets the DSP skip the drain entirely when nothing
//! changed.
//!
//! Smoothing is not the bus's job: audible parameters are gliding
//! one-pole followers inside the effects, fed from the targets read here.

use crate::error::ConfigError;
use cuerda_arp::ArpPattern;
use cuerda_core::NoteDivision;
use cuerda_effects::DistortionKind;
use cuerda_synth::Waveform;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Every externally settable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamId {
    LeftDelayS,
    RightDelayS,
    Feedback,
    WetMix,
    DryMix,
    PingPong,
    StereoWidth,
    CrossFeedback,
    DistortionEnabled,
    DistortionKind,
    DistortionDrive,
    DistortionMix,
    DistortionFeedbackIntensity,
    Bpm,
    Pattern,
    SynthKind,
    ArpDurationS,
    ArpEnabled,
    DelayEnabled,
    DelayFeedbackLpHz,
    DelaySync,
    LeftDivision,
    RightDivision,
    MinChordConfidence,
    ChordHoldTimeS,
}

/// Value domain of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDomain {
    /// Continuous value in [min, max].
    Range { min: f32, max: f32 },
    /// Off/on, stored as 0.0 / 1.0.
    Toggle,
    /// Index into a closed vocabulary of `count` entries.
    Choice { count: u32 },
}

impl ParamId {
    /// All parameters, in cell order.
    pub const ALL: [ParamId; 25] = [
        ParamId::LeftDelayS,
        ParamId::RightDelayS,
        ParamId::Feedback,
        ParamId::WetMix,
        ParamId::DryMix,
        ParamId::PingPong,
        ParamId::StereoWidth,
        ParamId::CrossFeedback,
        ParamId::DistortionEnabled,
        ParamId::DistortionKind,
        ParamId::DistortionDrive,
        ParamId::DistortionMix,
        ParamId::DistortionFeedbackIntensity,
        ParamId::Bpm,
        ParamId::Pattern,
        ParamId::SynthKind,
        ParamId::ArpDurationS,
        ParamId::ArpEnabled,
        ParamId::DelayEnabled,
        ParamId::DelayFeedbackLpHz,
        ParamId::DelaySync,
        ParamId::LeftDivision,
        ParamId::RightDivision,
        ParamId::MinChordConfidence,
        ParamId::ChordHoldTimeS,
    ];

    /// Control-surface name.
    pub fn name(self) -> &'static str {
        match self {
            ParamId::LeftDelayS => "left_delay_s",
            ParamId::RightDelayS => "right_delay_s",
            ParamId::Feedback => "feedback",
            ParamId::WetMix => "wet_mix",
            ParamId::DryMix => "dry_mix",
            ParamId::PingPong => "ping_pong",
            ParamId::StereoWidth => "stereo_width",
            ParamId::CrossFeedback => "cross_feedback",
            ParamId::DistortionEnabled => "distortion_enabled",
            ParamId::DistortionKind => "distortion_kind",
            ParamId::DistortionDrive => "distortion_drive",
            ParamId::DistortionMix => "distortion_mix",
            ParamId::DistortionFeedbackIntensity => "distortion_feedback_intensity",
            ParamId::Bpm => "bpm",
            ParamId::Pattern => "pattern",
            ParamId::SynthKind => "synth_kind",
            ParamId::ArpDurationS => "arp_duration_s",
            ParamId::ArpEnabled => "arp_enabled",
            ParamId::DelayEnabled => "delay_enabled",
            ParamId::DelayFeedbackLpHz => "delay_feedback_lp_hz",
            ParamId::DelaySync => "delay_sync",
            ParamId::LeftDivision => "left_division",
            ParamId::RightDivision => "right_division",
            ParamId::MinChordConfidence => "min_chord_confidence",
            ParamId::ChordHoldTimeS => "chord_hold_time_s",
        }
    }

    /// Parse a control-surface name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// The admissible domain.
    pub fn domain(self) -> ParamDomain {
        match self {
            ParamId::LeftDelayS | ParamId::RightDelayS => ParamDomain::Range {
                min: 0.001,
                max: 2.0,
            },
            ParamId::Feedback => ParamDomain::Range { min: 0.0, max: 0.9 },
            ParamId::WetMix
            | ParamId::DryMix
            | ParamId::StereoWidth
            | ParamId::DistortionDrive
            | ParamId::DistortionMix
            | ParamId::DistortionFeedbackIntensity
            | ParamId::MinChordConfidence => ParamDomain::Range { min: 0.0, max: 1.0 },
            ParamId::CrossFeedback => ParamDomain::Range { min: 0.0, max: 0.5 },
            ParamId::PingPong
            | ParamId::DistortionEnabled
            | ParamId::ArpEnabled
            | ParamId::DelayEnabled
            | ParamId::DelaySync => ParamDomain::Toggle,
            ParamId::DelayFeedbackLpHz => ParamDomain::Range {
                min: 200.0,
                max: 20_000.0,
            },
            ParamId::LeftDivision | ParamId::RightDivision => ParamDomain::Choice {
                count: NoteDivision::ALL.len() as u32,
            },
            ParamId::DistortionKind => ParamDomain::Choice {
                count: DistortionKind::ALL.len() as u32,
            },
            ParamId::Pattern => ParamDomain::Choice {
                count: ArpPattern::ALL.len() as u32,
            },
            ParamId::SynthKind => ParamDomain::Choice {
                count: Waveform::ALL.len() as u32,
            },
            ParamId::Bpm => ParamDomain::Range {
                min: 20.0,
                max: 300.0,
            },
            ParamId::ArpDurationS => ParamDomain::Range { min: 0.5, max: 10.0 },
            ParamId::ChordHoldTimeS => ParamDomain::Range {
                min: 0.05,
                max: 2.0,
            },
        }
    }

    fn cell(self) -> usize {
        Self::ALL.iter().position(|&p| p == self).unwrap()
    }
}

/// The shared parameter store.
///
/// Writers are control threads; the single reader is the audio thread. All
/// accesses are single-word atomics, so neither side ever blocks.
pub struct ParamBus {
    cells: [AtomicU32; ParamId::ALL.len()],
    generation: AtomicU64,
}

impl ParamBus {
    /// Build a bus with every cell at its initial value.
    pub fn new(initial: impl Fn(ParamId) -> f32) -> Self {
        let cells = std::array::from_fn(|i| AtomicU32::new(initial(ParamId::ALL[i]).to_bits()));
        Self {
            cells,
            generation: AtomicU64::new(0),
        }
    }

    /// Publish a target value after validating its domain.
    ///
    /// The loop-gain invariant is enforced here: a write to `feedback` or
    /// `cross_feedback` that would push their sum to 1.0 or beyond is
    /// rejected, so the delay network stays BIBO-stable no matter what a
    /// control surface sends.
    pub fn set(&self, id: ParamId, value: f32) -> Result<(), ConfigError> {
        let accepted = match id.domain() {
            ParamDomain::Range { min, max } => {
                if !value.is_finite() || value < min || value > max {
                    return Err(ConfigError::OutOfRange {
                        name: id.name(),
                        value,
                        min,
                        max,
                    });
                }
                value
            }
            ParamDomain::Toggle => {
                if value != 0.0 && value != 1.0 {
                    return Err(ConfigError::OutOfRange {
                        name: id.name(),
                        value,
                        min: 0.0,
                        max: 1.0,
                    });
                }
                value
            }
            ParamDomain::Choice { count } => {
                let idx = value as u32;
                if !value.is_finite() || value.fract() != 0.0 || idx >= count {
                    return Err(ConfigError::OutOfRange {
                        name: id.name(),
                        value,
                        min: 0.0,
                        max: (count - 1) as f32,
                    });
                }
                value
            }
        };

        if id == ParamId::Feedback {
            let total = accepted + self.get(ParamId::CrossFeedback);
            if total >= 1.0 {
                return Err(ConfigError::LoopGain(total));
            }
        }
        if id == ParamId::CrossFeedback {
            let total = accepted + self.get(ParamId::Feedback);
            if total >= 1.0 {
                return Err(ConfigError::LoopGain(total));
            }
        }

        self.cells[id.cell()].store(accepted.to_bits(), Ordering::Release);
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Toggle convenience.
    pub fn set_bool(&self, id: ParamId, on: bool) -> Result<(), ConfigError> {
        self.set(id, if on { 1.0 } else { 0.0 })
    }

    /// Set a choice parameter by vocabulary name.
    pub fn set_named(&self, id: ParamId, name: &str) -> Result<(), ConfigError> {
        let index = match id {
            ParamId::DistortionKind => DistortionKind::from_name(name)
                .map(|k| DistortionKind::ALL.iter().position(|&x| x == k).unwrap()),
            ParamId::Pattern => ArpPattern::from_name(name)
                .map(|p| ArpPattern::ALL.iter().position(|&x| x == p).unwrap()),
            ParamId::SynthKind => Waveform::from_name(name)
                .map(|w| Waveform::ALL.iter().position(|&x| x == w).unwrap()),
            ParamId::LeftDivision | ParamId::RightDivision => NoteDivision::from_name(name)
                .map(|d| NoteDivision::ALL.iter().position(|&x| x == d).unwrap()),
            _ => None,
        };
        match index {
            Some(i) => self.set(id, i as f32),
            None => Err(ConfigError::UnknownName {
                kind: id.name(),
                name: name.to_string(),
            }),
        }
    }

    /// Read the last accepted target.
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.cells[id.cell()].load(Ordering::Acquire))
    }

    /// Toggle read convenience.
    #[inline]
    pub fn get_bool(&self, id: ParamId) -> bool {
        self.get(id) >= 0.5
    }

    /// Monotonic change counter; the DSP skips the drain while unchanged.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
