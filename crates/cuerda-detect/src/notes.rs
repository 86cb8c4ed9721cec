//! Pitch classes and note binning.
//!
//! Maps spectral peak frequencies onto the twelve equal-temperament pitch
//! classes (A4 = 440 Hz) with a cents deviation measure, and deduplicates
//! detections per class.

use cuerda_core::{cents_between, pitch_to_freq};
use libm::{floorf, log2f, roundf};

/// One of the twelve pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    /// All twelve classes in chromatic order.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Semitone index with C = 0.
    #[inline]
    pub fn semitone(self) -> u8 {
        self as u8
    }

    /// Pitch class from a semitone index (taken modulo 12).
    #[inline]
    pub fn from_semitone(semitone: i32) -> Self {
        Self::ALL[semitone.rem_euclid(12) as usize]
    }

    /// The class `semitones` above this one.
    #[inline]
    pub fn transposed(self, semitones: i32) -> Self {
        Self::from_semitone(self.semitone() as i32 + semitones)
    }

    /// Display name, sharps only.
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }

    /// Parse a sharp-style name ("C", "F#", ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|pc| pc.name() == name)
    }
}

/// A note extracted from one spectral peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedNote {
    pub pitch_class: PitchClass,
    pub octave: i32,
    /// Spectral magnitude of the underlying peak.
    pub strength: f32,
    /// Deviation from the equal-temperament reference, in cents.
    pub cents_off: f32,
}

/// Peaks further than this from the nearest note are discarded as
/// non-harmonic content.
pub const MAX_CENTS_OFF: f32 = 50.0;

/// Map a frequency to the nearest equal-temperament note.
///
/// Returns `None` for non-positive frequencies or peaks more than
/// [`MAX_CENTS_OFF`] cents from any note.
pub fn nearest_note(freq: f32, strength: f32) -> Option<DetectedNote> {
    if freq <= 0.0 || !freq.is_finite() {
        return None;
    }

    // Semitones from A4, rounded to the nearest note.
    let semis_from_a4 = roundf(12.0 * log2f(freq / 440.0)) as i32;
    // A4 is semitone 9 of octave 4.
    let abs_semitone = semis_from_a4 + 9;
    let pitch_class = PitchClass::from_semitone(abs_semitone);
    let octave = 4 + floorf(abs_semitone as f32 / 12.0) as i32;

    let reference = pitch_to_freq(pitch_class.semitone(), octave);
    let cents_off = cents_between(freq, reference);
    if cents_off.abs() > MAX_CENTS_OFF {
        return None;
    }

    Some(DetectedNote {
        pitch_class,
        octave,
        strength,
        cents_off,
    })
}

/// Deduplicate notes by pitch class, keeping the strongest instance of each.
/// The result is sorted by descending strength.
pub fn dedup_by_class(notes: &[DetectedNote]) -> Vec<DetectedNote> {
    let mut best: [Option<DetectedNote>; 12] = [None; 12];
    for note in notes {
        let slot = &mut best[note.pitch_class.semitone() as usize];
        match slot {
            Some(existing) if existing.strength >= note.strength => {}
            _ => *slot = Some(*note),
        }
    }
    let mut out: Vec<DetectedNote> = best.into_iter().flatten().collect();
    out.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a440_maps_to_a4() {
        let note = nearest_note(440.0, 1.0).unwrap();
        assert_eq!(note.pitch_class, PitchClass::A);
        assert_eq!(note.octave, 4);
        assert!(note.cents_off.abs() < 0.01);
    }

    #[test]
    fn middle_c_maps_to_c4() {
        let note = nearest_note(261.63, 1.0).unwrap();
        assert_eq!(note.pitch_class, PitchClass::C);
        assert_eq!(note.octave, 4);
    }

    #[test]
    fn b3_sits_below_the_octave_boundary() {
        let note = nearest_note(246.94, 1.0).unwrap();
        assert_eq!(note.pitch_class, PitchClass::B);
        assert_eq!(note.octave, 3);
    }

    #[test]
    fn low_e_string() {
        let note = nearest_note(82.41, 1.0).unwrap();
        assert_eq!(note.pitch_class, PitchClass::E);
        assert_eq!(note.octave, 2);
    }

    #[test]
    fn sharp_detune_reports_cents() {
        // 30 cents above A4.
        let freq = 440.0 * libm::powf(2.0, 30.0 / 1200.0);
        let note = nearest_note(freq, 1.0).unwrap();
        assert_eq!(note.pitch_class, PitchClass::A);
        assert!((note.cents_off - 30.0).abs() < 0.5);
    }

    #[test]
    fn cents_never_exceed_half_a_semitone() {
        // Nearest-note rounding bounds the deviation at 50 cents; sweep the
        // band and confirm every accepted note honours that bound.
        let mut f = 80.0f32;
        while f < 2000.0 {
            if let Some(n) = nearest_note(f, 1.0) {
                assert!(n.cents_off.abs() <= 50.0 + 1e-3, "{f} Hz -> {}", n.cents_off);
            }
            f *= 1.013;
        }
    }

    #[test]
    fn invalid_frequencies_are_none() {
        assert!(nearest_note(0.0, 1.0).is_none());
        assert!(nearest_note(-100.0, 1.0).is_none());
        assert!(nearest_note(f32::NAN, 1.0).is_none());
    }

    #[test]
    fn dedup_keeps_strongest_per_class() {
        let notes = [
            nearest_note(261.63, 0.5).unwrap(),
            nearest_note(523.25, 0.9).unwrap(), // C5, stronger
            nearest_note(329.63, 0.7).unwrap(),
        ];
        let unique = dedup_by_class(&notes);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].pitch_class, PitchClass::C);
        assert_eq!(unique[0].octave, 5);
        assert_eq!(unique[1].pitch_class, PitchClass::E);
    }

    #[test]
    fn transposition_wraps() {
        assert_eq!(PitchClass::A.transposed(3), PitchClass::C);
        assert_eq!(PitchClass::C.transposed(-1), PitchClass::B);
        assert_eq!(PitchClass::G.transposed(12), PitchClass::G);
    }

    #[test]
    fn name_roundtrip() {
        for pc in PitchClass::ALL {
            assert_eq!(PitchClass::from_name(pc.name()), Some(pc));
        }
    }
}
