//! Cuerda Detect - polyphonic chord detection from live audio
//!
//! The pipeline: input blocks accumulate in an analysis ring; every stride a
//! Hann-windowed FFT produces a magnitude spectrum; in-band peaks map to
//! equal-temperament notes; the detected pitch-class set is matched against
//! the chord vocabulary; temporal hysteresis stabilizes the result into the
//! *latched* chord that the arpeggiator consumes.
//!
//! ```text
//! blocks ─► AnalysisRing ─► Hann+FFT ─► peaks ─► notes ─► match ─► hysteresis ─► latched Chord
//! ```

pub mod chords;
pub mod detector;
pub mod fft;
pub mod notes;

pub use chords::{match_chord, Chord, ChordQuality};
pub use detector::{ChordDetector, DetectorConfig};
pub use fft::{SpectralPeak, SpectrumAnalyzer};
pub use notes::{dedup_by_class, nearest_note, DetectedNote, PitchClass};
