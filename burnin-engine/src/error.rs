//! Error types for the burn-in engine.

use std::fmt;

/// Errors that can occur while configuring or running a burn-in phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Corrupt or unreadable persisted state, or an invalid phase definition.
    Config(String),
    /// No usable output device, or the stream could not be opened.
    DeviceInit(String),
    /// Write failure during streaming.
    Io(String),
    /// The (preset, phase) pair is absent from the catalog.
    UnknownPhase { preset: String, phase: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(msg) => write!(f, "config error: {}", msg),
            EngineError::DeviceInit(msg) => write!(f, "audio device init failed: {}", msg),
            EngineError::Io(msg) => write!(f, "I/O error: {}", msg),
            EngineError::UnknownPhase { preset, phase } => {
                write!(f, "unknown phase: {:?} in preset {:?}", phase, preset)
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}
