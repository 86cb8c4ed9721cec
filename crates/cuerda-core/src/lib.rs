//! Cuerda Core - DSP primitives for the guitar effects engine
//!
//! Foundational building blocks shared by the effect, detector, and synth
//! crates:
//!
//! - [`Effect`] trait for mono/stereo processors
//! - [`SmoothedParam`] for zipper-free parameter changes
//! - [`InterpolatedDelay`] circular delay line with fractional reads
//! - [`Lfo`] sine modulator for delay-time wow
//! - [`OnePole`] lowpass for feedback-path damping
//! - [`StateVariableFilter`] resonant filter for the lead voice
//! - [`AnalysisRing`] mono accumulation ring for spectral analysis
//! - [`TempoManager`] and [`NoteDivision`] for tempo-synced times
//! - waveshaping and level-conversion helpers in [`math`]
//!
//! ## no_std Support
//!
//! This crate is `no_std` compatible. Use `default-features = false` in your
//! `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! cuerda-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod delay;
pub mod effect;
pub mod lfo;
pub mod math;
pub mod one_pole;
pub mod param;
pub mod ring;
pub mod svf;
pub mod tempo;

pub use delay::InterpolatedDelay;
pub use effect::Effect;
pub use lfo::Lfo;
pub use math::{
    cents_between, db_to_linear, flush_denormal, hard_clip, lerp, linear_to_db, output_clamp,
    pitch_to_freq, saturate_guard, soft_clip,
};
pub use one_pole::OnePole;
pub use param::SmoothedParam;
pub use ring::AnalysisRing;
pub use svf::StateVariableFilter;
pub use tempo::{NoteDivision, TempoManager};
