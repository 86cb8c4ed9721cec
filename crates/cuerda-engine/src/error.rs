//! Error taxonomy.
//!
//! Three fatal categories, raised only before streaming starts or at the
//! parameter boundary. Runtime anomalies are deliberately *not* errors: the
//! audio callback is total, recovers locally, and bumps a counter in the
//! status snapshot instead.

use thiserror::Error;

/// Invalid configuration or parameter value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported sample rate {0} (expected 44100, 48000, 96000, or 192000)")]
    SampleRate(u32),

    #[error("block size {0} must be a power of two in 128..=8192")]
    BlockSize(usize),

    #[error("{name} = {value} is outside {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("unknown {kind} name \"{name}\"")]
    UnknownName { kind: &'static str, name: String },

    #[error("feedback + cross_feedback = {0} would push the loop gain to 1.0 or beyond")]
    LoopGain(f32),
}

/// Operation out of order with the engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,
}

/// Resource limits exceeded at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ResourceError {
    #[error("block size {requested} exceeds the engine ceiling of {ceiling} frames")]
    BlockTooLarge { requested: usize, ceiling: usize },

    #[error("delay buffers would need {requested_bytes} bytes, over the {budget_bytes} byte budget")]
    DelayBufferTooLarge {
        requested_bytes: usize,
        budget_bytes: usize,
    },
}

/// Any fatal engine error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Non-fatal anomalies recovered inside the audio callback and counted in
/// the status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    /// A NaN or infinite sample was replaced with silence.
    NonFiniteSample,
    /// A note-on had to cut off a still-sounding voice.
    VoiceExhausted,
    /// An analysis frame was skipped because the detector fell behind.
    AnalysisSkipped,
}
