//! Voice synthesis and the bounded polyphonic pool.
//!
//! Each voice renders one arp note: a waveform generator (nine timbres), a
//! linear ADSR envelope with per-timbre defaults, velocity scaling. The pool
//! allocates voices on note-on, reclaiming the oldest released voice first
//! when full.

use crate::envelope::AdsrEnvelope;
use cuerda_core::{pitch_to_freq, Effect, StateVariableFilter};
use cuerda_detect::PitchClass;
use libm::{powf, sinf};

use core::f32::consts::TAU;

/// Voice timbre selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Saw,
    Triangle,
    /// Two-operator FM, modulator at ~2.1x the carrier.
    Fm,
    /// Noise burst through a one-pole lowpass with exponential decay.
    Pluck,
    /// Layered detuned saws with added harmonics, soft contour.
    Pad,
    /// Saw plus square through a resonant lowpass, sharp attack.
    Lead,
    /// Sine reinforced by a subharmonic saw.
    Bass,
}

impl Waveform {
    /// All timbres, for control surfaces and tests.
    pub const ALL: [Waveform; 9] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Saw,
        Waveform::Triangle,
        Waveform::Fm,
        Waveform::Pluck,
        Waveform::Pad,
        Waveform::Lead,
        Waveform::Bass,
    ];

    /// Control-surface name.
    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Saw => "saw",
            Waveform::Triangle => "triangle",
            Waveform::Fm => "fm",
            Waveform::Pluck => "pluck",
            Waveform::Pad => "pad",
            Waveform::Lead => "lead",
            Waveform::Bass => "bass",
        }
    }

    /// Parse a control-surface name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|w| w.name() == name)
    }

    /// Envelope defaults (attack ms, decay ms, sustain, release ms) chosen
    /// per timbre: plucks snap and die, pads swell, basses ring out.
    fn envelope_defaults(self) -> (f32, f32, f32, f32) {
        match self {
            Waveform::Pluck => (5.0, 80.0, 0.0, 120.0),
            Waveform::Pad => (100.0, 150.0, 0.8, 300.0),
            Waveform::Lead => (10.0, 60.0, 0.9, 100.0),
            Waveform::Bass => (50.0, 100.0, 0.8, 400.0),
            _ => (50.0, 100.0, 0.7, 200.0),
        }
    }

    /// Secondary-oscillator frequency ratio (FM modulator, pad detune,
    /// bass subharmonic). 0 means unused.
    fn secondary_ratio(self) -> f32 {
        match self {
            Waveform::Fm => 2.1,
            // +7 cents detune for the pad layer.
            Waveform::Pad => 1.004_05,
            Waveform::Bass => 0.5,
            _ => 0.0,
        }
    }
}

/// Result of a note-on request against the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceAllocation {
    /// A silent voice was available.
    Free,
    /// The oldest released voice was reclaimed.
    StoleReleased,
    /// Every voice was still held; the oldest was cut off.
    StoleActive,
}

/// A single synthesizer voice.
#[derive(Debug, Clone)]
pub struct Voice {
    waveform: Waveform,
    envelope: AdsrEnvelope,
    sample_rate: f32,

    frequency: f32,
    phase: f32,
    phase_inc: f32,
    /// Secondary phase: FM modulator, pad detune layer, bass subharmonic.
    phase2: f32,
    phase2_inc: f32,

    /// One-pole lowpass state for the pluck timbre.
    lp_state: f32,
    /// Resonant lowpass for the lead timbre, retuned per note.
    filter: StateVariableFilter,
    /// Exponential burst decay for the pluck timbre.
    burst: f32,
    noise_state: u32,

    velocity: f32,
    gain: f32,
    age: u64,
    active: bool,
}

impl Voice {
    pub fn new(sample_rate: f32) -> Self {
        let (a, d, s, r) = Waveform::Sine.envelope_defaults();
        Self {
            waveform: Waveform::Sine,
            envelope: AdsrEnvelope::new(sample_rate, a, d, s, r),
            sample_rate,
            frequency: 440.0,
            phase: 0.0,
            phase_inc: 440.0 / sample_rate,
            phase2: 0.0,
            phase2_inc: 0.0,
            lp_state: 0.0,
            filter: StateVariableFilter::new(sample_rate),
            burst: 0.0,
            noise_state: 0x1234_5678,
            velocity: 1.0,
            gain: 1.0,
            age: 0,
            active: false,
        }
    }

    /// Start the voice on a pitch.
    pub fn note_on(
        &mut self,
        pitch_class: PitchClass,
        octave: i32,
        velocity: f32,
        waveform: Waveform,
    ) {
        self.waveform = waveform;
        let (a, d, s, r) = waveform.envelope_defaults();
        self.envelope.configure(a, d, s, r);

        self.frequency = pitch_to_freq(pitch_class.semitone(), octave);
        self.phase = 0.0;
        self.phase_inc = self.frequency / self.sample_rate;
        let ratio = waveform.secondary_ratio();
        self.phase2 = 0.0;
        self.phase2_inc = self.frequency * ratio / self.sample_rate;

        self.lp_state = 0.0;
        if waveform == Waveform::Lead {
            // The lead's resonant peak rides a couple of octaves above the
            // fundamental, accenting the upper harmonics of the saw.
            self.filter.set_cutoff(self.frequency * 4.0);
            self.filter.set_resonance(3.0);
            self.filter.reset();
        }
        self.burst = 1.0;
        self.velocity = velocity.clamp(0.0, 1.0);
        self.active = true;
        self.envelope.gate_on();
    }

    /// Flag the voice for release; it fades over the envelope release time.
    pub fn note_off(&mut self) {
        self.envelope.gate_off();
    }

    /// Silence the voice immediately.
    pub fn kill(&mut self) {
        self.active = false;
        self.envelope.reset();
    }

    /// Whether the voice is producing sound.
    pub fn is_active(&self) -> bool {
        self.active && self.envelope.is_active()
    }

    /// Whether the gate has been released.
    pub fn is_released(&self) -> bool {
        self.envelope.is_released()
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn set_age(&mut self, age: u64) {
        self.age = age;
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.envelope.set_sample_rate(sample_rate);
        self.filter.set_sample_rate(sample_rate);
        self.phase_inc = self.frequency / sample_rate;
        self.phase2_inc = self.frequency * self.waveform.secondary_ratio() / sample_rate;
    }

    #[inline]
    fn advance_phases(&mut self) {
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.phase2 += self.phase2_inc;
        if self.phase2 >= 1.0 {
            self.phase2 -= 1.0;
        }
    }

    #[inline]
    fn next_noise(&mut self) -> f32 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        (x as i32 as f32) / (i32::MAX as f32)
    }

    #[inline]
    fn lowpass(&mut self, input: f32, coeff: f32) -> f32 {
        self.lp_state += coeff * (input - self.lp_state);
        self.lp_state
    }

    /// Generate the raw waveform sample at the current phases.
    #[inline]
    fn waveform_sample(&mut self) -> f32 {
        let p = self.phase;
        match self.waveform {
            Waveform::Sine => sinf(p * TAU),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * p - 1.0,
            Waveform::Triangle => {
                if p < 0.5 {
                    4.0 * p - 1.0
                } else {
                    3.0 - 4.0 * p
                }
            }
            Waveform::Fm => {
                let modulator = sinf(self.phase2 * TAU);
                sinf(p * TAU + 3.0 * modulator)
            }
            Waveform::Pluck => {
                let noise = self.next_noise() * self.burst;
                // Burst decays at ~3 per second; the lowpass tracks the
                // fundamental for a string-like spectrum.
                self.burst *= powf(core::f32::consts::E, -3.0 / self.sample_rate);
                let coeff = (self.frequency * 4.0 / self.sample_rate).clamp(0.01, 0.8);
                let excitation = noise + sinf(p * TAU) * 0.6;
                self.lowpass(excitation, coeff)
            }
            Waveform::Pad => {
                let saw_a = 2.0 * p - 1.0;
                let saw_b = 2.0 * self.phase2 - 1.0;
                let body = 0.35 * (saw_a + saw_b);
                let shimmer = 0.3 * sinf(2.0 * p * TAU) + 0.15 * sinf(3.0 * p * TAU);
                body + shimmer
            }
            Waveform::Lead => {
                let saw = 2.0 * p - 1.0;
                let square = if p < 0.5 { 0.3 } else { -0.3 };
                self.filter.process(saw + square) * 0.7
            }
            Waveform::Bass => {
                let sub = 2.0 * self.phase2 - 1.0;
                sinf(p * TAU) + 0.4 * sub
            }
        }
    }

    /// Render one sample: waveform, envelope, velocity, voice gain.
    #[inline]
    pub fn process(&mut self) -> f32 {
        if !self.is_active() {
            self.active = false;
            return 0.0;
        }
        let raw = self.waveform_sample();
        self.advance_phases();
        let env = self.envelope.advance();
        if !self.envelope.is_active() {
            self.active = false;
        }
        raw * env * self.velocity * self.gain
    }
}

/// Bounded pool of voices with oldest-released stealing.
#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
    age_counter: u64,
}

impl VoicePool {
    /// Create a pool of `count` voices (at least 1).
    pub fn new(count: usize, sample_rate: f32) -> Self {
        let count = count.max(1);
        Self {
            voices: (0..count).map(|_| Voice::new(sample_rate)).collect(),
            age_counter: 0,
        }
    }

    /// Number of voices in the pool.
    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Number of currently sounding voices.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Set the per-voice output gain.
    pub fn set_voice_gain(&mut self, gain: f32) {
        for v in &mut self.voices {
            v.set_gain(gain);
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for v in &mut self.voices {
            v.set_sample_rate(sample_rate);
        }
    }

    /// Start a note, stealing if necessary. Returns how the voice was found.
    pub fn note_on(
        &mut self,
        pitch_class: PitchClass,
        octave: i32,
        velocity: f32,
        waveform: Waveform,
    ) -> VoiceAllocation {
        self.age_counter += 1;
        let age = self.age_counter;

        let (idx, allocation) = if let Some(i) = self.voices.iter().position(|v| !v.is_active()) {
            (i, VoiceAllocation::Free)
        } else if let Some(i) = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_released())
            .min_by_key(|(_, v)| v.age())
            .map(|(i, _)| i)
        {
            (i, VoiceAllocation::StoleReleased)
        } else {
            let i = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.age())
                .map(|(i, _)| i)
                .unwrap_or(0);
            (i, VoiceAllocation::StoleActive)
        };

        self.voices[idx].set_age(age);
        self.voices[idx].note_on(pitch_class, octave, velocity, waveform);
        allocation
    }

    /// Release every voice playing the given pitch.
    pub fn note_off(&mut self, pitch_class: PitchClass, octave: i32) {
        let freq = pitch_to_freq(pitch_class.semitone(), octave);
        for v in &mut self.voices {
            if v.is_active() && !v.is_released() && (v.frequency() - freq).abs() < 0.5 {
                v.note_off();
            }
        }
    }

    /// Release all voices (graceful fade through their envelopes).
    pub fn release_all(&mut self) {
        for v in &mut self.voices {
            v.note_off();
        }
    }

    /// Hard-stop and clear everything.
    pub fn reset(&mut self) {
        for v in &mut self.voices {
            v.kill();
        }
        self.age_counter = 0;
    }

    /// Sum all active voices into one sample.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let mut sum = 0.0;
        for v in &mut self.voices {
            sum += v.process();
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PitchClass::{A, C, E, G};

    #[test]
    fn voice_produces_sound_after_note_on() {
        let mut voice = Voice::new(48_000.0);
        voice.note_on(A, 4, 1.0, Waveform::Sine);
        let mut energy = 0.0;
        for _ in 0..4800 {
            energy += voice.process().abs();
        }
        assert!(energy > 1.0);
    }

    #[test]
    fn all_waveforms_are_finite_and_bounded() {
        for waveform in Waveform::ALL {
            let mut voice = Voice::new(48_000.0);
            voice.note_on(C, 4, 1.0, waveform);
            for i in 0..9600 {
                let s = voice.process();
                assert!(s.is_finite(), "{waveform:?} sample {i} not finite");
                assert!(s.abs() < 2.0, "{waveform:?} sample {i} = {s}");
            }
        }
    }

    #[test]
    fn voice_fades_out_after_release() {
        let mut voice = Voice::new(48_000.0);
        voice.note_on(A, 4, 1.0, Waveform::Sine);
        for _ in 0..9600 {
            voice.process();
        }
        voice.note_off();
        // Release default 200 ms; run well past it.
        for _ in 0..48_000 / 2 {
            voice.process();
        }
        assert!(!voice.is_active());
        assert_eq!(voice.process(), 0.0);
    }

    #[test]
    fn frequency_follows_pitch_and_octave() {
        let mut voice = Voice::new(48_000.0);
        voice.note_on(A, 4, 1.0, Waveform::Sine);
        assert!((voice.frequency() - 440.0).abs() < 0.01);
        voice.note_on(A, 5, 1.0, Waveform::Sine);
        assert!((voice.frequency() - 880.0).abs() < 0.01);
        voice.note_on(C, 4, 1.0, Waveform::Sine);
        assert!((voice.frequency() - 261.63).abs() < 0.05);
    }

    #[test]
    fn lead_note_tunes_the_resonant_filter() {
        let mut voice = Voice::new(48_000.0);
        voice.note_on(A, 4, 1.0, Waveform::Lead);
        assert!((voice.filter.resonance() - 3.0).abs() < 1e-6);
        assert!((voice.filter.cutoff() - 4.0 * 440.0).abs() < 1.0);

        let mut energy = 0.0;
        for _ in 0..4800 {
            energy += voice.process().abs();
        }
        assert!(energy > 1.0, "lead should sound through the filter");
    }

    #[test]
    fn lead_filter_follows_the_octave() {
        let mut voice = Voice::new(48_000.0);
        voice.note_on(A, 3, 1.0, Waveform::Lead);
        let low = voice.filter.cutoff();
        voice.note_on(A, 4, 1.0, Waveform::Lead);
        let high = voice.filter.cutoff();
        assert!((high / low - 2.0).abs() < 0.01, "{low} -> {high}");
    }

    #[test]
    fn sine_voice_oscillates_at_pitch() {
        let mut voice = Voice::new(48_000.0);
        voice.note_on(A, 4, 1.0, Waveform::Sine);
        let mut crossings = 0;
        let mut prev = 0.0;
        for _ in 0..48_000 {
            let s = voice.process();
            if prev <= 0.0 && s > 0.0 {
                crossings += 1;
            }
            prev = s;
        }
        assert!((crossings as i32 - 440).abs() <= 3, "got {crossings}");
    }

    #[test]
    fn pool_allocates_free_voices_first() {
        let mut pool = VoicePool::new(4, 48_000.0);
        for pc in [C, E, G] {
            assert_eq!(pool.note_on(pc, 4, 0.8, Waveform::Saw), VoiceAllocation::Free);
        }
        assert_eq!(pool.active_count(), 3);
    }

    #[test]
    fn pool_steals_released_before_active() {
        let mut pool = VoicePool::new(2, 48_000.0);
        pool.note_on(C, 4, 0.8, Waveform::Sine);
        pool.note_on(E, 4, 0.8, Waveform::Sine);
        pool.note_off(C, 4);

        // Pool is full, but the C voice is releasing; it should be the one
        // reclaimed.
        let alloc = pool.note_on(G, 4, 0.8, Waveform::Sine);
        assert_eq!(alloc, VoiceAllocation::StoleReleased);
    }

    #[test]
    fn pool_exhaustion_steals_the_oldest() {
        let mut pool = VoicePool::new(2, 48_000.0);
        pool.note_on(C, 4, 0.8, Waveform::Sine);
        pool.note_on(E, 4, 0.8, Waveform::Sine);
        let alloc = pool.note_on(G, 4, 0.8, Waveform::Sine);
        assert_eq!(alloc, VoiceAllocation::StoleActive);
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn pool_mixes_voices() {
        let mut pool = VoicePool::new(8, 48_000.0);
        pool.note_on(C, 4, 0.8, Waveform::Sine);
        pool.note_on(E, 4, 0.8, Waveform::Sine);
        pool.note_on(G, 4, 0.8, Waveform::Sine);

        let mut energy = 0.0;
        for _ in 0..4800 {
            energy += pool.process().abs();
        }
        assert!(energy > 1.0);
    }

    #[test]
    fn reset_silences_the_pool() {
        let mut pool = VoicePool::new(8, 48_000.0);
        pool.note_on(C, 4, 0.8, Waveform::Pad);
        pool.reset();
        assert_eq!(pool.active_count(), 0);
        for _ in 0..100 {
            assert_eq!(pool.process(), 0.0);
        }
    }

    #[test]
    fn release_all_fades_gracefully() {
        let mut pool = VoicePool::new(8, 48_000.0);
        pool.note_on(C, 4, 0.8, Waveform::Sine);
        pool.note_on(E, 4, 0.8, Waveform::Sine);
        for _ in 0..4800 {
            pool.process();
        }
        pool.release_all();
        // Still audible during release, silent afterwards.
        assert!(pool.active_count() > 0);
        for _ in 0..48_000 {
            pool.process();
        }
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn waveform_name_roundtrip() {
        for w in Waveform::ALL {
            assert_eq!(Waveform::from_name(w.name()), Some(w));
        }
    }
}
