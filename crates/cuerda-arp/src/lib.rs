//! Cuerda Arp - chord-to-timeline expansion
//!
//! Turns the latched chord into an ordered, immutable [`ArpTimeline`] of
//! [`ArpNote`]s according to an [`ArpPattern`], tempo, and duration. The
//! engine walks the timeline with a play cursor and hands note on/off events
//! to the voice pool.

pub mod pattern;
pub mod timeline;

pub use pattern::{ArpPattern, XorShift32};
pub use timeline::{generate, ArpNote, ArpTimeline};
