//! Burnin Engine — phase catalog, signal generation, scheduling, persistence.
//!
//! Crate layout:
//! - [`catalog`]   : presets × phases → immutable signal plans
//! - [`signal`]    : chunk renderer for the three waveform families
//! - [`scheduler`] : the worker loop driving generate → write → advance
//! - [`session`]   : resumable on-disk session state
//! - [`sink`]      : audio output abstraction (+ cpal implementation)
//! - [`error`]     : engine-wide error taxonomy
//!
//! The engine runs one background worker per phase; the presentation layer
//! talks to it exclusively through [`Scheduler`] operations, a progress
//! snapshot, and an event channel.

pub mod catalog;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod signal;
pub mod sink;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use catalog::{PhaseCatalog, PhaseConfig, Waveform};
pub use error::EngineError;
pub use scheduler::{EngineEvent, Progress, Scheduler, SchedulerConfig};
pub use session::{PersistedState, StateStore};
pub use signal::SignalGenerator;
pub use sink::{AudioSink, SinkProvider, StreamSpec};

#[cfg(feature = "realtime")]
pub use sink::CpalOutput;
