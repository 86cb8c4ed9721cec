//! Cuerda Engine - real-time orchestration of the guitar effects core
//!
//! The [`Engine`] runs the fixed per-block chain inside the audio host's
//! callback: input sanitization, arp voice rendering, the stereo delay, the
//! output saturation guard, and the chord detector feed. Control
//! collaborators (CLI, web controller, GPIO handlers) hold an
//! [`EngineHandle`] and interact exclusively through the lock-free
//! [`ParamBus`] and the atomic [`StatusSnapshot`] readout.
//!
//! ```rust
//! use cuerda_engine::{Engine, EngineConfig, ParamId};
//!
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! let handle = engine.handle();
//! engine.start().unwrap();
//!
//! handle.set(ParamId::LeftDelayS, 0.25).unwrap();
//! handle.set_bool(ParamId::PingPong, true).unwrap();
//!
//! // Inside the audio callback:
//! let input = vec![0.0f32; 1024];
//! let mut output = vec![0.0f32; 1024];
//! engine.process(&input, &mut output);
//!
//! let status = handle.status();
//! assert!(status.running);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod params;
pub mod status;

pub use config::{EngineConfig, SUPPORTED_SAMPLE_RATES};
pub use engine::{Engine, EngineHandle, MAX_BLOCK_FRAMES};
pub use error::{
    AnomalyKind, ConfigError, EngineError, LifecycleError, ResourceError, Result,
};
pub use host::{mono_to_interleaved, AudioHost, StaticHost};
pub use params::{ParamBus, ParamDomain, ParamId};
pub use status::{AudibleLevels, LatchedChord, StatusSnapshot};
