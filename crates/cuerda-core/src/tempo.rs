//! Musical tempo and note-division arithmetic.
//!
//! Converts BPM plus a note division into seconds or samples, for
//! tempo-synced delay times.

/// Musical note divisions, straight, dotted, and triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteDivision {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    DottedHalf,
    DottedQuarter,
    DottedEighth,
    TripletQuarter,
    TripletEighth,
    TripletSixteenth,
}

impl NoteDivision {
    /// All divisions, for control surfaces.
    pub const ALL: [NoteDivision; 12] = [
        NoteDivision::Whole,
        NoteDivision::Half,
        NoteDivision::Quarter,
        NoteDivision::Eighth,
        NoteDivision::Sixteenth,
        NoteDivision::ThirtySecond,
        NoteDivision::DottedHalf,
        NoteDivision::DottedQuarter,
        NoteDivision::DottedEighth,
        NoteDivision::TripletQuarter,
        NoteDivision::TripletEighth,
        NoteDivision::TripletSixteenth,
    ];

    /// Length in quarter-note beats.
    pub fn beats(self) -> f32 {
        match self {
            NoteDivision::Whole => 4.0,
            NoteDivision::Half => 2.0,
            NoteDivision::Quarter => 1.0,
            NoteDivision::Eighth => 0.5,
            NoteDivision::Sixteenth => 0.25,
            NoteDivision::ThirtySecond => 0.125,
            NoteDivision::DottedHalf => 3.0,
            NoteDivision::DottedQuarter => 1.5,
            NoteDivision::DottedEighth => 0.75,
            NoteDivision::TripletQuarter => 2.0 / 3.0,
            NoteDivision::TripletEighth => 1.0 / 3.0,
            NoteDivision::TripletSixteenth => 1.0 / 6.0,
        }
    }

    /// Control-surface name.
    pub fn name(self) -> &'static str {
        match self {
            NoteDivision::Whole => "whole",
            NoteDivision::Half => "half",
            NoteDivision::Quarter => "quarter",
            NoteDivision::Eighth => "eighth",
            NoteDivision::Sixteenth => "sixteenth",
            NoteDivision::ThirtySecond => "thirty_second",
            NoteDivision::DottedHalf => "dotted_half",
            NoteDivision::DottedQuarter => "dotted_quarter",
            NoteDivision::DottedEighth => "dotted_eighth",
            NoteDivision::TripletQuarter => "triplet_quarter",
            NoteDivision::TripletEighth => "triplet_eighth",
            NoteDivision::TripletSixteenth => "triplet_sixteenth",
        }
    }

    /// Parse a control-surface name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.name() == name)
    }
}

/// Tempo state: BPM plus sample rate, with division conversions.
#[derive(Debug, Clone, Copy)]
pub struct TempoManager {
    bpm: f32,
    sample_rate: f32,
}

impl TempoManager {
    pub fn new(sample_rate: f32, bpm: f32) -> Self {
        Self {
            bpm: bpm.max(1.0),
            sample_rate,
        }
    }

    /// Set the tempo (clamped to at least 1 BPM).
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Length of one division at the current tempo, in seconds.
    pub fn division_seconds(&self, division: NoteDivision) -> f32 {
        division.beats() * 60.0 / self.bpm
    }

    /// Length of one division at the current tempo, in samples.
    pub fn division_samples(&self, division: NoteDivision) -> f32 {
        self.division_seconds(division) * self.sample_rate
    }
}
