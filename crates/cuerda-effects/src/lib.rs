//! Cuerda Effects - the stereo delay chain of the guitar engine
//!
//! Two processors built on `cuerda-core`:
//!
//! - [`DistortionUnit`] - six waveshaping variants, designed to sit inside
//!   the cross-feedback path of the delay
//! - [`StereoDelay`] - dual modulated delay lines with cross-feedback,
//!   ping-pong routing, and mid/side width enhancement
//!
//! Both implement the [`Effect`](cuerda_core::Effect) trait; `StereoDelay`
//! is a true stereo effect.

pub mod distortion;
pub mod stereo_delay;

pub use distortion::{DistortionKind, DistortionUnit};
pub use stereo_delay::StereoDelay;
