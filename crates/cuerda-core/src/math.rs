//! DSP math helpers: level conversion, waveshaping, tuning arithmetic.
//!
//! All functions are allocation-free and rely on `libm` so results are
//! identical across targets.

use libm::{expf, log2f, logf, powf, tanhf};

/// Convert decibels to linear gain (0 dB -> 1.0, -6 dB -> ~0.5).
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels. Inputs at or below zero floor at -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Hyperbolic-tangent soft clip. Smooth saturation approaching +/-1.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Hard clip to the +/-threshold range.
#[inline]
pub fn hard_clip(x: f32, threshold: f32) -> f32 {
    x.clamp(-threshold, threshold)
}

/// Soft limiter for the summed synth voice bus.
///
/// Linear up to 0.99, tanh-folding above so a full pool of voices cannot
/// swamp the chain; content at or below 0.99 passes untouched. Non-finite
/// input maps to 0.
#[inline]
pub fn saturate_guard(x: f32) -> f32 {
    if !x.is_finite() {
        return 0.0;
    }
    const KNEE: f32 = 0.99;
    let mag = x.abs();
    if mag <= KNEE {
        x
    } else {
        let over = mag - KNEE;
        let folded = KNEE + (1.0 - KNEE) * tanhf(over / (1.0 - KNEE));
        if x < 0.0 { -folded } else { folded }
    }
}

/// Output-stage bound.
///
/// Transparent for everything inside [-1, 1] — a full-scale sample passes at
/// exactly unity — and pins anything beyond full scale to the rail.
/// Non-finite input maps to 0.
#[inline]
pub fn output_clamp(x: f32) -> f32 {
    if !x.is_finite() {
        return 0.0;
    }
    x.clamp(-1.0, 1.0)
}

/// Flush denormal values to zero.
///
/// Denormals cause massive slowdowns on some CPUs when they circulate in
/// feedback loops; anything below 1e-20 is inaudible and safe to zero.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Signed distance in cents from `reference` to `freq` (1200 per octave).
#[inline]
pub fn cents_between(freq: f32, reference: f32) -> f32 {
    1200.0 * log2f(freq / reference)
}

/// Frequency of the pitch `semitone` (0 = C .. 11 = B) in `octave`,
/// equal temperament, A4 = 440 Hz.
#[inline]
pub fn pitch_to_freq(semitone: u8, octave: i32) -> f32 {
    // A4 is semitone 9 in octave 4.
    let semis_from_a4 = (semitone as i32 - 9) + (octave - 4) * 12;
    440.0 * powf(2.0, semis_from_a4 as f32 / 12.0)
}
