//! Engine configuration snapshot.
//!
//! The embedding application builds (or deserializes) an [`EngineConfig`]
//! once and hands it to [`Engine::new`](crate::Engine::new); the engine is
//! otherwise stateless across runs. Validation reports the first offending
//! field as a typed error.

use crate::error::ConfigError;
use cuerda_arp::ArpPattern;
use cuerda_synth::Waveform;
use serde::{Deserialize, Serialize};

/// Sample rates the engine accepts.
pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [44_100, 48_000, 96_000, 192_000];

/// Validated configuration snapshot for one engine session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Session sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per callback block; power of two.
    pub block_size: usize,
    /// Per-channel delay line headroom in seconds.
    pub max_delay_seconds: f32,
    /// Polyphony of the voice pool.
    pub voice_count: usize,

    /// Detector confidence threshold.
    pub min_chord_confidence: f32,
    /// Detector hysteresis hold time in seconds.
    pub chord_hold_time_s: f32,

    /// Initial arp tempo.
    pub tempo_bpm: f32,
    /// Initial arp pattern name (see [`ArpPattern::from_name`]).
    pub pattern: String,
    /// Initial synth timbre name (see [`Waveform::from_name`]).
    pub synth: String,
    /// Arp timeline length in seconds.
    pub arp_duration_s: f32,
    /// Seed for the randomized arp patterns.
    pub arp_seed: u32,

    /// Whether the arpeggiator starts enabled.
    pub arp_enabled: bool,
    /// Whether the stereo delay starts enabled.
    pub delay_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 512,
            max_delay_seconds: 4.0,
            voice_count: 32,
            min_chord_confidence: 0.6,
            chord_hold_time_s: 0.5,
            tempo_bpm: 120.0,
            pattern: "up".into(),
            synth: "saw".into(),
            arp_duration_s: 2.0,
            arp_seed: 0x5EED_0001,
            arp_enabled: false,
            delay_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Check every field, returning the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if !self.block_size.is_power_of_two() || !(128..=8192).contains(&self.block_size) {
            return Err(ConfigError::BlockSize(self.block_size));
        }
        check_range(
            "max_delay_seconds",
            self.max_delay_seconds,
            0.01,
            10.0,
        )?;
        check_range("voice_count", self.voice_count as f32, 32.0, 256.0)?;
        check_range(
            "min_chord_confidence",
            self.min_chord_confidence,
            0.0,
            1.0,
        )?;
        check_range("chord_hold_time_s", self.chord_hold_time_s, 0.05, 2.0)?;
        check_range("tempo_bpm", self.tempo_bpm, 20.0, 300.0)?;
        check_range("arp_duration_s", self.arp_duration_s, 0.5, 10.0)?;

        self.parsed_pattern()?;
        self.parsed_synth()?;
        Ok(())
    }

    /// The configured pattern, parsed.
    pub fn parsed_pattern(&self) -> Result<ArpPattern, ConfigError> {
        ArpPattern::from_name(&self.pattern).ok_or_else(|| ConfigError::UnknownName {
            kind: "pattern",
            name: self.pattern.clone(),
        })
    }

    /// The configured synth timbre, parsed.
    pub fn parsed_synth(&self) -> Result<Waveform, ConfigError> {
        Waveform::from_name(&self.synth).ok_or_else(|| ConfigError::UnknownName {
            kind: "synth",
            name: self.synth.clone(),
        })
    }
}

fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}
