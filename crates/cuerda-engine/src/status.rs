//! Atomic status readout.
//!
//! The DSP thread publishes gauges and counters into [`StatusShared`] after
//! each block; control collaborators take a [`StatusSnapshot`] whenever they
//! like. Everything is a single-word atomic, so neither side waits.

use crate::error::AnomalyKind;
use cuerda_detect::{Chord, ChordQuality, PitchClass};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Bit layout of the packed chord cell:
/// `valid << 31 | root << 16 | quality << 8 | confidence_byte`.
const CHORD_VALID_BIT: u32 = 1 << 31;

fn pack_chord(chord: &Chord) -> u32 {
    let confidence = (chord.confidence.clamp(0.0, 1.0) * 255.0) as u32;
    CHORD_VALID_BIT
        | (chord.root.semitone() as u32) << 16
        | (ChordQuality::ALL
            .iter()
            .position(|&q| q == chord.quality)
            .unwrap_or(0) as u32)
            << 8
        | confidence
}

fn unpack_chord(bits: u32) -> Option<LatchedChord> {
    if bits & CHORD_VALID_BIT == 0 {
        return None;
    }
    let root = PitchClass::from_semitone(((bits >> 16) & 0xF) as i32);
    let quality = ChordQuality::ALL[((bits >> 8) & 0xF) as usize % ChordQuality::ALL.len()];
    let confidence = (bits & 0xFF) as f32 / 255.0;
    Some(LatchedChord {
        root,
        quality,
        confidence,
    })
}

/// Compact chord summary for the status surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatchedChord {
    pub root: PitchClass,
    pub quality: ChordQuality,
    pub confidence: f32,
}

impl LatchedChord {
    /// e.g. "A minor".
    pub fn summary(&self) -> String {
        format!("{} {}", self.root.name(), self.quality.name())
    }
}

/// The audible (post-smoothing) values of the click-sensitive parameters,
/// as heard right now rather than as last requested.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudibleLevels {
    pub left_delay_s: f32,
    pub right_delay_s: f32,
    pub feedback: f32,
    pub cross_feedback: f32,
    pub wet_mix: f32,
    pub dry_mix: f32,
    pub stereo_width: f32,
}

/// Shared atomic status cells.
#[derive(Debug, Default)]
pub struct StatusShared {
    running: AtomicBool,
    chord: AtomicU32,
    active_voices: AtomicU32,
    input_peak: AtomicU32,
    output_peak: AtomicU32,
    cpu_load: AtomicU32,
    non_finite_samples: AtomicU64,
    voices_exhausted: AtomicU64,
    analyses_skipped: AtomicU64,
    audible: [AtomicU32; 7],
}

impl StatusShared {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn publish_chord(&self, chord: Option<&Chord>) {
        let bits = chord.map_or(0, pack_chord);
        self.chord.store(bits, Ordering::Release);
    }

    pub(crate) fn publish_block(
        &self,
        active_voices: usize,
        input_peak: f32,
        output_peak: f32,
        cpu_load: f32,
    ) {
        self.active_voices
            .store(active_voices as u32, Ordering::Relaxed);
        self.input_peak.store(input_peak.to_bits(), Ordering::Relaxed);
        self.output_peak
            .store(output_peak.to_bits(), Ordering::Relaxed);
        self.cpu_load.store(cpu_load.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn publish_audible(&self, levels: AudibleLevels) {
        let values = [
            levels.left_delay_s,
            levels.right_delay_s,
            levels.feedback,
            levels.cross_feedback,
            levels.wet_mix,
            levels.dry_mix,
            levels.stereo_width,
        ];
        for (cell, value) in self.audible.iter().zip(values) {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    pub(crate) fn count_anomaly(&self, kind: AnomalyKind) {
        let cell = match kind {
            AnomalyKind::NonFiniteSample => &self.non_finite_samples,
            AnomalyKind::VoiceExhausted => &self.voices_exhausted,
            AnomalyKind::AnalysisSkipped => &self.analyses_skipped,
        };
        cell.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a coherent-enough snapshot of all cells.
    pub fn snapshot(&self) -> StatusSnapshot {
        let a = |i: usize| f32::from_bits(self.audible[i].load(Ordering::Relaxed));
        StatusSnapshot {
            running: self.running.load(Ordering::Acquire),
            chord: unpack_chord(self.chord.load(Ordering::Acquire)),
            active_voices: self.active_voices.load(Ordering::Relaxed) as usize,
            input_peak: f32::from_bits(self.input_peak.load(Ordering::Relaxed)),
            output_peak: f32::from_bits(self.output_peak.load(Ordering::Relaxed)),
            cpu_load: f32::from_bits(self.cpu_load.load(Ordering::Relaxed)),
            non_finite_samples: self.non_finite_samples.load(Ordering::Relaxed),
            voices_exhausted: self.voices_exhausted.load(Ordering::Relaxed),
            analyses_skipped: self.analyses_skipped.load(Ordering::Relaxed),
            audible: AudibleLevels {
                left_delay_s: a(0),
                right_delay_s: a(1),
                feedback: a(2),
                cross_feedback: a(3),
                wet_mix: a(4),
                dry_mix: a(5),
                stereo_width: a(6),
            },
        }
    }
}

/// One point-in-time reading of the engine status.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub running: bool,
    /// The chord currently latched by the detector, if any.
    pub chord: Option<LatchedChord>,
    pub active_voices: usize,
    /// Peak |sample| of the last input block.
    pub input_peak: f32,
    /// Peak |sample| of the last output block.
    pub output_peak: f32,
    /// Fraction of the block budget the last callback consumed.
    pub cpu_load: f32,
    pub non_finite_samples: u64,
    pub voices_exhausted: u64,
    pub analyses_skipped: u64,
    /// Post-smoothing values of the click-sensitive parameters.
    pub audible: AudibleLevels,
}
