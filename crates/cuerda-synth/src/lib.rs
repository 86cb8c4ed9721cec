//! Cuerda Synth - polyphonic voice rendering for the arpeggiator
//!
//! A bounded [`VoicePool`] renders scheduled arp notes through nine timbres
//! ([`Waveform`]) and linear ADSR envelopes ([`AdsrEnvelope`]). The pool
//! never allocates after construction; note-on requests reclaim the oldest
//! released voice when the pool is full.

pub mod envelope;
pub mod voice;

pub use envelope::{AdsrEnvelope, EnvelopeState};
pub use voice::{Voice, VoiceAllocation, VoicePool, Waveform};
