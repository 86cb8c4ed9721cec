//! Chord vocabulary and matching.
//!
//! Every detected pitch class is hypothesized as a root against every chord
//! quality; the scorer rewards coverage of the expected pitch-class set and
//! penalizes extra notes, with a perfect-match bonus.

use crate::notes::PitchClass;

/// Chord quality vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordQuality {
    Major,
    Minor,
    Major7,
    Minor7,
    Dominant7,
    Sus2,
    Sus4,
    Diminished,
    Augmented,
    Add9,
    Power,
}

impl ChordQuality {
    /// All qualities, in match precedence order (earlier wins score ties).
    pub const ALL: [ChordQuality; 11] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Major7,
        ChordQuality::Minor7,
        ChordQuality::Dominant7,
        ChordQuality::Sus2,
        ChordQuality::Sus4,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
        ChordQuality::Add9,
        ChordQuality::Power,
    ];

    /// Semitone intervals from the root.
    pub fn intervals(self) -> &'static [i32] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Sus2 => &[0, 2, 7],
            ChordQuality::Sus4 => &[0, 5, 7],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::Add9 => &[0, 4, 7, 14],
            ChordQuality::Power => &[0, 7],
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            ChordQuality::Major => "major",
            ChordQuality::Minor => "minor",
            ChordQuality::Major7 => "major7",
            ChordQuality::Minor7 => "minor7",
            ChordQuality::Dominant7 => "dominant7",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Diminished => "diminished",
            ChordQuality::Augmented => "augmented",
            ChordQuality::Add9 => "add9",
            ChordQuality::Power => "power",
        }
    }

    /// The pitch-class set of this quality built on `root`.
    pub fn pitch_classes(self, root: PitchClass) -> Vec<PitchClass> {
        self.intervals()
            .iter()
            .map(|&i| root.transposed(i))
            .collect()
    }
}

/// A matched chord with its pitch-class content and confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Chord {
    pub root: PitchClass,
    pub quality: ChordQuality,
    /// Match confidence in [0, 1].
    pub confidence: f32,
    /// The distinct pitch classes the chord was matched from, sorted by
    /// chromatic order. This is what the arpeggiator walks.
    pub notes: Vec<PitchClass>,
    /// Detection time in seconds since the detector started.
    pub time_s: f64,
}

impl Chord {
    /// Short human-readable summary, e.g. "C major".
    pub fn summary(&self) -> String {
        format!("{} {}", self.root.name(), self.quality.name())
    }
}

/// Score one (root, quality) hypothesis against the detected set.
///
/// `matches / |expected| - 0.1 * extras`, clamped to [0, 1], promoted to
/// exactly 1.0 when detected and expected are the same set.
fn score_hypothesis(detected: &[PitchClass], root: PitchClass, quality: ChordQuality) -> f32 {
    let expected = quality.pitch_classes(root);
    let matches = expected
        .iter()
        .filter(|pc| detected.contains(pc))
        .count();

    let mut score = matches as f32 / expected.len() as f32;
    if detected.len() > expected.len() {
        score -= 0.1 * (detected.len() - expected.len()) as f32;
    }
    if matches == expected.len() && detected.len() == expected.len() {
        score = 1.0;
    }
    score.clamp(0.0, 1.0)
}

/// Find the best chord hypothesis over the detected pitch classes.
///
/// Needs at least two distinct classes; returns the highest-scoring
/// (root, quality) pair. Roots are tried in the order the classes appear,
/// qualities in [`ChordQuality::ALL`] order; the first strictly-best
/// hypothesis wins ties.
pub fn match_chord(detected: &[PitchClass], time_s: f64) -> Option<Chord> {
    if detected.len() < 2 {
        return None;
    }

    let mut unique: Vec<PitchClass> = Vec::with_capacity(detected.len());
    for &pc in detected {
        if !unique.contains(&pc) {
            unique.push(pc);
        }
    }
    if unique.len() < 2 {
        return None;
    }

    let mut best: Option<(PitchClass, ChordQuality, f32)> = None;
    for &root in &unique {
        for quality in ChordQuality::ALL {
            let score = score_hypothesis(&unique, root, quality);
            if best.map_or(true, |(_, _, s)| score > s) {
                best = Some((root, quality, score));
            }
        }
    }

    best.map(|(root, quality, confidence)| {
        let mut notes = unique;
        notes.sort();
        Chord {
            root,
            quality,
            confidence,
            notes,
            time_s,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use PitchClass::*;

    #[test]
    fn c_major_triad_is_perfect() {
        let chord = match_chord(&[C, E, G], 0.0).unwrap();
        assert_eq!(chord.root, C);
        assert_eq!(chord.quality, ChordQuality::Major);
        assert_eq!(chord.confidence, 1.0);
        assert_eq!(chord.notes, vec![C, E, G]);
    }

    #[test]
    fn a_minor_triad() {
        let chord = match_chord(&[A, C, E], 0.0).unwrap();
        assert_eq!(chord.root, A);
        assert_eq!(chord.quality, ChordQuality::Minor);
        assert_eq!(chord.confidence, 1.0);
    }

    #[test]
    fn g_dominant_seventh() {
        let chord = match_chord(&[G, B, D, F], 0.0).unwrap();
        assert_eq!(chord.root, G);
        assert_eq!(chord.quality, ChordQuality::Dominant7);
        assert_eq!(chord.confidence, 1.0);
    }

    #[test]
    fn power_chord_from_two_notes() {
        let chord = match_chord(&[E, B], 0.0).unwrap();
        assert_eq!(chord.root, E);
        assert_eq!(chord.quality, ChordQuality::Power);
        assert_eq!(chord.confidence, 1.0);
    }

    #[test]
    fn sus_chords_resolve() {
        let sus2 = match_chord(&[D, E, A], 0.0).unwrap();
        assert_eq!(sus2.root, D);
        assert_eq!(sus2.quality, ChordQuality::Sus2);

        let sus4 = match_chord(&[D, G, A], 0.0).unwrap();
        assert_eq!(sus4.root, D);
        assert_eq!(sus4.quality, ChordQuality::Sus4);
    }

    #[test]
    fn extra_note_reduces_confidence() {
        // C major plus a stray F#.
        let chord = match_chord(&[C, E, G, Fs], 0.0).unwrap();
        assert!(chord.confidence < 1.0);
        assert!(chord.confidence > 0.5);
    }

    #[test]
    fn single_note_is_no_chord() {
        assert!(match_chord(&[C], 0.0).is_none());
        assert!(match_chord(&[], 0.0).is_none());
        assert!(match_chord(&[C, C, C], 0.0).is_none());
    }

    #[test]
    fn duplicate_classes_collapse() {
        let chord = match_chord(&[C, C, E, G, G], 0.0).unwrap();
        assert_eq!(chord.confidence, 1.0);
        assert_eq!(chord.notes, vec![C, E, G]);
    }

    #[test]
    fn diminished_and_augmented() {
        let dim = match_chord(&[B, D, F], 0.0).unwrap();
        assert_eq!(dim.root, B);
        assert_eq!(dim.quality, ChordQuality::Diminished);

        let aug = match_chord(&[C, E, Gs], 0.0).unwrap();
        assert_eq!(aug.quality, ChordQuality::Augmented);
    }

    #[test]
    fn interval_tables_are_consistent() {
        for quality in ChordQuality::ALL {
            let intervals = quality.intervals();
            assert_eq!(intervals[0], 0, "{quality:?} must contain its root");
            let classes = quality.pitch_classes(C);
            assert_eq!(classes.len(), intervals.len());
        }
        // add9's 14-semitone interval wraps to D over a C root.
        assert!(ChordQuality::Add9.pitch_classes(C).contains(&D));
    }

    #[test]
    fn summary_formats_root_and_quality() {
        let chord = match_chord(&[C, E, G], 1.5).unwrap();
        assert_eq!(chord.summary(), "C major");
    }
}
