//! Arp timeline generation.
//!
//! A timeline is an immutable, time-ordered list of notes expanded from the
//! latched chord's pitch classes. The engine regenerates it whenever the
//! chord, tempo, pattern, or duration changes, then walks it with a play
//! cursor while the voice pool renders the notes.

use crate::pattern::{ArpPattern, XorShift32};
use cuerda_detect::PitchClass;

/// One scheduled note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArpNote {
    pub pitch_class: PitchClass,
    pub octave: i32,
    /// Seconds from timeline start.
    pub start_time: f32,
    /// Note length in seconds.
    pub duration: f32,
    /// Velocity in [0, 1].
    pub velocity: f32,
}

/// An immutable expansion of a chord into scheduled notes.
///
/// Invariants: `start_time` values are non-decreasing, and every note ends
/// at or before the timeline duration.
#[derive(Debug, Clone, Default)]
pub struct ArpTimeline {
    notes: Vec<ArpNote>,
    duration_s: f32,
}

impl ArpTimeline {
    /// The empty timeline (an empty or invalid chord expands to this).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scheduled notes, ordered by start time.
    pub fn notes(&self) -> &[ArpNote] {
        &self.notes
    }

    /// Total timeline length in seconds.
    pub fn duration_s(&self) -> f32 {
        self.duration_s
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Per-pattern rhythm constants.
const TRANCE_EMPHASIS: [f32; 4] = [1.0, 0.6, 0.8, 0.7];
const ROCK_EMPHASIS: [f32; 4] = [1.0, 0.7, 0.9, 0.7];
const DUBSTEP_RHYTHM: [f32; 4] = [0.5, 0.25, 0.25, 0.5];
/// Index of the silent slot in the dubstep rhythm.
const DUBSTEP_REST: usize = 3;
/// Ambient notes advance by this fraction of their base length, overlapping.
const AMBIENT_STRIDE: f32 = 0.75;

/// Expand a chord's pitch classes into a timeline.
///
/// `seed` drives the randomized patterns; fixed seed, fixed output. Empty
/// input or non-positive duration yields the empty timeline.
pub fn generate(
    chord_notes: &[PitchClass],
    pattern: ArpPattern,
    tempo_bpm: f32,
    duration_s: f32,
    seed: u32,
) -> ArpTimeline {
    if chord_notes.is_empty() || duration_s <= 0.0 || tempo_bpm <= 0.0 {
        return ArpTimeline::empty();
    }

    let mut sorted: Vec<PitchClass> = chord_notes.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut rng = XorShift32::new(seed);
    let mut notes = match pattern {
        ArpPattern::Up => walk_sequence(&sorted, tempo_bpm, duration_s, 2.0, 1.0, |_| 0.8),
        ArpPattern::Down => {
            let reversed: Vec<PitchClass> = sorted.iter().rev().copied().collect();
            walk_sequence(&reversed, tempo_bpm, duration_s, 2.0, 1.0, |_| 0.8)
        }
        ArpPattern::UpDown => {
            let seq = pendulum(&sorted, false);
            walk_sequence(&seq, tempo_bpm, duration_s, 2.0, 1.0, |_| 0.8)
        }
        ArpPattern::DownUp => {
            let seq = pendulum(&sorted, true);
            walk_sequence(&seq, tempo_bpm, duration_s, 2.0, 1.0, |_| 0.8)
        }
        ArpPattern::Random => random_walk(&sorted, tempo_bpm, duration_s, &mut rng),
        ArpPattern::OctaveUp => octave_cycle(&sorted, tempo_bpm, duration_s, &[3, 4, 5], false),
        ArpPattern::OctaveDown => octave_cycle(&sorted, tempo_bpm, duration_s, &[5, 4, 3], true),
        ArpPattern::Trance16th => {
            walk_sequence(&sorted, tempo_bpm, duration_s, 4.0, 1.0, |step| {
                TRANCE_EMPHASIS[step % TRANCE_EMPHASIS.len()] * 0.8
            })
        }
        ArpPattern::DubstepChop => dubstep_chop(&sorted, tempo_bpm, duration_s, &mut rng),
        ArpPattern::AmbientFlow => ambient_flow(&sorted, tempo_bpm, duration_s, &mut rng),
        ArpPattern::RockEighth => {
            walk_sequence(&sorted, tempo_bpm, duration_s, 2.0, 0.9, |step| {
                ROCK_EMPHASIS[step % ROCK_EMPHASIS.len()] * 0.8
            })
        }
    };

    // Clamp note ends to the timeline and restore time order (ambient
    // jitter can nudge starts, including past the end).
    notes.retain(|n| n.start_time < duration_s);
    for note in &mut notes {
        note.duration = note.duration.min(duration_s - note.start_time).max(0.0);
    }
    notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    ArpTimeline {
        notes,
        duration_s,
    }
}

/// Base note length from tempo: `60 / (bpm * subdivision)`.
fn base_duration(tempo_bpm: f32, subdivision: f32) -> f32 {
    60.0 / (tempo_bpm * subdivision)
}

/// Common cursor walk: cycle `sequence` at a fixed subdivision, velocity
/// from the step index, notes at octave 4.
fn walk_sequence(
    sequence: &[PitchClass],
    tempo_bpm: f32,
    duration_s: f32,
    subdivision: f32,
    length_factor: f32,
    velocity: impl Fn(usize) -> f32,
) -> Vec<ArpNote> {
    let dur = base_duration(tempo_bpm, subdivision);
    let mut notes = Vec::new();
    let mut t = 0.0f32;
    let mut step = 0usize;

    while t < duration_s {
        let pc = sequence[step % sequence.len()];
        notes.push(ArpNote {
            pitch_class: pc,
            octave: 4,
            start_time: t,
            duration: dur * length_factor,
            velocity: velocity(step),
        });
        t += dur;
        step += 1;
    }
    notes
}

/// Forward-then-back traversal without repeating the endpoints.
fn pendulum(sorted: &[PitchClass], start_descending: bool) -> Vec<PitchClass> {
    if sorted.len() <= 2 {
        return sorted.to_vec();
    }
    let forward: Vec<PitchClass> = if start_descending {
        sorted.iter().rev().copied().collect()
    } else {
        sorted.to_vec()
    };
    let mut seq = forward.clone();
    seq.extend(forward[1..forward.len() - 1].iter().rev());
    seq
}

/// Uniform draws without replacement; the bag refills once emptied.
fn random_walk(
    sorted: &[PitchClass],
    tempo_bpm: f32,
    duration_s: f32,
    rng: &mut XorShift32,
) -> Vec<ArpNote> {
    let dur = base_duration(tempo_bpm, 2.0);
    let mut notes = Vec::new();
    let mut bag: Vec<PitchClass> = Vec::new();
    let mut t = 0.0f32;

    while t < duration_s {
        if bag.is_empty() {
            bag = sorted.to_vec();
        }
        let pc = bag.swap_remove(rng.index(bag.len()));
        notes.push(ArpNote {
            pitch_class: pc,
            octave: 4,
            start_time: t,
            duration: dur,
            velocity: rng.range(0.6, 0.9),
        });
        t += dur;
    }
    notes
}

/// Sixteenth-note runs cycling through `octaves`, notes ascending or
/// descending to match the octave direction.
fn octave_cycle(
    sorted: &[PitchClass],
    tempo_bpm: f32,
    duration_s: f32,
    octaves: &[i32],
    descending: bool,
) -> Vec<ArpNote> {
    let dur = base_duration(tempo_bpm, 4.0);
    let order: Vec<PitchClass> = if descending {
        sorted.iter().rev().copied().collect()
    } else {
        sorted.to_vec()
    };

    let mut notes = Vec::new();
    let mut t = 0.0f32;
    'outer: loop {
        for &octave in octaves {
            for &pc in &order {
                if t >= duration_s {
                    break 'outer;
                }
                let velocity = if descending {
                    0.9 - (5 - octave) as f32 * 0.1
                } else {
                    0.7 + (octave - 3) as f32 * 0.1
                };
                notes.push(ArpNote {
                    pitch_class: pc,
                    octave,
                    start_time: t,
                    duration: dur,
                    velocity,
                });
                t += dur;
            }
        }
    }
    notes
}

/// Long-short-short-rest chop; random note and octave per hit, the downbeat
/// accented.
fn dubstep_chop(
    sorted: &[PitchClass],
    tempo_bpm: f32,
    duration_s: f32,
    rng: &mut XorShift32,
) -> Vec<ArpNote> {
    let beat = 60.0 / tempo_bpm;
    let octaves = [3, 4, 5];
    let mut notes = Vec::new();
    let mut t = 0.0f32;

    'outer: loop {
        for (slot, &fraction) in DUBSTEP_RHYTHM.iter().enumerate() {
            if t >= duration_s {
                break 'outer;
            }
            let slot_len = beat * fraction;
            if slot != DUBSTEP_REST {
                notes.push(ArpNote {
                    pitch_class: sorted[rng.index(sorted.len())],
                    octave: octaves[rng.index(octaves.len())],
                    start_time: t,
                    duration: slot_len * 0.8,
                    velocity: if slot == 0 { 0.9 } else { 0.7 },
                });
            }
            t += slot_len;
        }
    }
    notes
}

/// Overlapping half notes with soft random velocities and octave drift.
fn ambient_flow(
    sorted: &[PitchClass],
    tempo_bpm: f32,
    duration_s: f32,
    rng: &mut XorShift32,
) -> Vec<ArpNote> {
    let base = base_duration(tempo_bpm, 0.5);
    let octaves = [3, 4, 5];
    let mut notes = Vec::new();
    let mut t = 0.0f32;

    'outer: loop {
        for &pc in sorted {
            if t >= duration_s {
                break 'outer;
            }
            let jitter = rng.range(-0.1, 0.1);
            notes.push(ArpNote {
                pitch_class: pc,
                octave: octaves[rng.index(octaves.len())],
                start_time: (t + jitter).max(0.0),
                duration: base * rng.range(0.8, 1.5),
                velocity: rng.range(0.3, 0.6),
            });
            t += base * AMBIENT_STRIDE;
        }
    }
    notes
}
