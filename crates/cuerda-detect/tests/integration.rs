//! Detector pipeline tests with realistic, harmonic-rich input.

use cuerda_detect::{ChordDetector, ChordQuality, DetectorConfig, PitchClass};
use std::f32::consts::TAU;

/// A plucked-string-like tone: fundamental plus decaying upper partials.
fn string_tone(freq: f32, t: f32) -> f32 {
    (TAU * freq * t).sin()
        + 0.3 * (TAU * freq * 2.0 * t).sin()
        + 0.1 * (TAU * freq * 3.0 * t).sin()
}

fn feed_chord(det: &mut ChordDetector, freqs: &[f32], seconds: f32, sr: f32) {
    let block = 512;
    let total = (seconds * sr) as usize;
    let mut buf = vec![0.0f32; block];
    let mut fed = 0usize;
    while fed < total {
        let n = block.min(total - fed);
        for (i, slot) in buf[..n].iter_mut().enumerate() {
            let t = (fed + i) as f32 / sr;
            *slot = freqs.iter().map(|&f| string_tone(f, t)).sum::<f32>() / (3.0 * freqs.len() as f32);
        }
        det.feed(&buf[..n]);
        fed += n;
    }
}

#[test]
fn detects_c_major_with_harmonics() {
    let sr = 48_000.0;
    let mut det = ChordDetector::new(DetectorConfig::new(sr));

    feed_chord(&mut det, &[261.63, 329.63, 392.0], 1.0, sr);

    let chord = det.latched().expect("should latch");
    assert_eq!(chord.root, PitchClass::C);
    assert_eq!(chord.quality, ChordQuality::Major);
    assert!(chord.confidence >= 0.6);
}

#[test]
fn detects_e_minor_in_the_low_register() {
    let sr = 48_000.0;
    let mut det = ChordDetector::new(DetectorConfig::new(sr));

    // E3, G3, B3.
    feed_chord(&mut det, &[164.81, 196.0, 246.94], 1.0, sr);

    let chord = det.latched().expect("should latch");
    assert_eq!(chord.root, PitchClass::E);
    assert_eq!(chord.quality, ChordQuality::Minor);
}

#[test]
fn detects_a_power_chord() {
    let sr = 48_000.0;
    let mut det = ChordDetector::new(DetectorConfig::new(sr));

    // A2 + E3, the classic two-note shape.
    feed_chord(&mut det, &[110.0, 164.81], 1.0, sr);

    let chord = det.latched().expect("should latch");
    assert_eq!(chord.root, PitchClass::A);
    assert_eq!(chord.quality, ChordQuality::Power);
}

#[test]
fn chord_change_relatches_after_hold() {
    let sr = 48_000.0;
    let mut det = ChordDetector::new(DetectorConfig::new(sr));

    feed_chord(&mut det, &[261.63, 329.63, 392.0], 1.0, sr);
    assert_eq!(det.latched().unwrap().root, PitchClass::C);

    // Move to G major; the old chord holds until the new one persists.
    feed_chord(&mut det, &[196.0, 246.94, 293.66], 0.2, sr);
    assert_eq!(det.latched().unwrap().root, PitchClass::C, "too early");

    feed_chord(&mut det, &[196.0, 246.94, 293.66], 0.8, sr);
    let chord = det.latched().expect("should relatch");
    assert_eq!(chord.root, PitchClass::G);
    assert_eq!(chord.quality, ChordQuality::Major);
}

#[test]
fn works_at_96khz() {
    let sr = 96_000.0;
    let config = DetectorConfig::new(sr);
    assert_eq!(config.analysis_size, 8192);
    let mut det = ChordDetector::new(config);

    feed_chord(&mut det, &[220.0, 277.18, 329.63], 1.0, sr);

    let chord = det.latched().expect("should latch at 96 kHz");
    assert_eq!(chord.root, PitchClass::A);
    assert_eq!(chord.quality, ChordQuality::Major);
}

#[test]
fn noise_floor_does_not_latch() {
    let sr = 48_000.0;
    let mut det = ChordDetector::new(DetectorConfig::new(sr));

    // Deterministic broadband noise at a low level.
    let mut state = 0x2468_ACE0u32;
    let mut buf = vec![0.0f32; 512];
    for _ in 0..200 {
        for slot in buf.iter_mut() {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *slot = (state as i32 as f32 / i32::MAX as f32) * 0.05;
        }
        det.feed(&buf);
    }

    if let Some(chord) = det.latched() {
        panic!("noise should not produce a stable chord, got {}", chord.summary());
    }
}
