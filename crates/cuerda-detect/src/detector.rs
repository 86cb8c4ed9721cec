//! Stateful chord detector with temporal hysteresis.
//!
//! Feed it mono input blocks; it accumulates them in an analysis ring and
//! runs one windowed FFT per stride. A newly matched chord only becomes the
//! *latched* chord after persisting as the best valid hypothesis for the
//! hold time; losing validity un-latches after the same interval. Downstream
//! consumers only ever observe the latched chord, so a wavering detection
//! never retriggers the arpeggiator.

use crate::chords::{match_chord, Chord};
use crate::fft::SpectrumAnalyzer;
use crate::notes::{dedup_by_class, nearest_note, DetectedNote, PitchClass};
use cuerda_core::AnalysisRing;

/// Configuration for the detector.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub sample_rate: f32,
    /// FFT window size; power of two, sized near 85 ms of signal.
    pub analysis_size: usize,
    /// Samples between analysis frames. Defaults to half the window for
    /// 50% overlap; must be at least the block size for bounded per-block
    /// work.
    pub analysis_stride: usize,
    /// Chords scoring below this are treated as invalid.
    pub min_confidence: f32,
    /// Seconds a candidate must persist before latching (and a dropout must
    /// persist before un-latching).
    pub hold_time_s: f32,
}

impl DetectorConfig {
    /// Sensible defaults at the given sample rate: ~85 ms window, 50%
    /// overlap, confidence 0.6, hold 0.5 s.
    pub fn new(sample_rate: f32) -> Self {
        // Power of two closest to 85 ms.
        let target = (sample_rate * 0.085) as usize;
        let analysis_size = target.next_power_of_two().max(1024);
        Self {
            sample_rate,
            analysis_size,
            analysis_stride: analysis_size / 2,
            min_confidence: 0.6,
            hold_time_s: 0.5,
        }
    }
}

/// Polyphonic chord detector over a live input stream.
pub struct ChordDetector {
    config: DetectorConfig,
    ring: AnalysisRing,
    analyzer: SpectrumAnalyzer,
    /// Scratch window, reused across frames.
    window: Vec<f32>,

    /// Total samples fed, the detector's clock.
    samples_fed: u64,

    /// Best valid hypothesis waiting out the hold time.
    pending: Option<Chord>,
    pending_since: f64,
    /// Currently latched chord, if any.
    latched: Option<Chord>,
    /// When valid detections disappeared (for un-latching).
    invalid_since: Option<f64>,

    /// Analysis frames run, for status and overrun accounting.
    frames_analyzed: u64,
}

impl ChordDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            ring: AnalysisRing::new(config.analysis_size),
            analyzer: SpectrumAnalyzer::new(config.analysis_size, config.sample_rate),
            window: vec![0.0; config.analysis_size],
            samples_fed: 0,
            pending: None,
            pending_since: 0.0,
            latched: None,
            invalid_since: None,
            frames_analyzed: 0,
            config,
        }
    }

    /// Current detector time in seconds.
    pub fn time_s(&self) -> f64 {
        self.samples_fed as f64 / self.config.sample_rate as f64
    }

    /// The chord downstream consumers should act on.
    pub fn latched(&self) -> Option<&Chord> {
        self.latched.as_ref()
    }

    /// Number of analysis frames run so far.
    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    /// True when a full stride has accumulated again right after an
    /// analysis ran, i.e. the detector could not keep up with the input
    /// rate and a frame was effectively skipped.
    pub fn is_behind(&self) -> bool {
        self.ring.is_full() && self.ring.samples_since_analysis() >= self.config.analysis_stride
    }

    /// Update the confidence threshold.
    pub fn set_min_confidence(&mut self, min: f32) {
        self.config.min_confidence = min.clamp(0.0, 1.0);
    }

    /// Update the hysteresis hold time.
    pub fn set_hold_time(&mut self, seconds: f32) {
        self.config.hold_time_s = seconds.max(0.0);
    }

    /// Feed one mono input block; runs at most one FFT when the stride has
    /// elapsed and the ring holds a full window.
    pub fn feed(&mut self, block: &[f32]) {
        self.ring.push_block(block);
        self.samples_fed += block.len() as u64;

        if self.ring.is_full() && self.ring.samples_since_analysis() >= self.config.analysis_stride
        {
            self.ring.mark_analyzed();
            self.run_analysis();
        }
    }

    /// Clear all accumulated state.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.samples_fed = 0;
        self.pending = None;
        self.pending_since = 0.0;
        self.latched = None;
        self.invalid_since = None;
        self.frames_analyzed = 0;
    }

    fn run_analysis(&mut self) {
        self.frames_analyzed += 1;
        let now = self.time_s();

        self.ring.latest(&mut self.window);
        let peaks = self.analyzer.analyze(&self.window);

        let notes: Vec<DetectedNote> = peaks
            .iter()
            .filter_map(|p| nearest_note(p.freq_hz, p.magnitude))
            .collect();
        let unique = dedup_by_class(&notes);
        let classes: Vec<PitchClass> = unique.iter().map(|n| n.pitch_class).collect();

        let candidate = match_chord(&classes, now)
            .filter(|c| c.confidence >= self.config.min_confidence);

        self.apply_hysteresis(candidate, now);
    }

    fn apply_hysteresis(&mut self, candidate: Option<Chord>, now: f64) {
        let hold = self.config.hold_time_s as f64;

        match candidate {
            Some(chord) => {
                self.invalid_since = None;

                if let Some(latched) = &mut self.latched {
                    if latched.root == chord.root && latched.quality == chord.quality {
                        // Same chord still sounding: refresh the reading.
                        *latched = chord;
                        self.pending = None;
                        return;
                    }
                }

                match &self.pending {
                    Some(pending)
                        if pending.root == chord.root && pending.quality == chord.quality =>
                    {
                        if now - self.pending_since >= hold {
                            self.latched = Some(chord);
                            self.pending = None;
                        }
                    }
                    _ => {
                        self.pending_since = chord.time_s;
                        self.pending = Some(chord);
                    }
                }
            }
            None => {
                // Continuity broken: a pending candidate must start over.
                self.pending = None;
                if self.latched.is_some() {
                    let since = *self.invalid_since.get_or_insert(now);
                    if now - since >= hold {
                        self.latched = None;
                        self.invalid_since = None;
                    }
                }
            }
        }
    }
}
