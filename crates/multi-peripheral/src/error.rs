//! Error types for peripheral sessions

use std::fmt;
use thiserror::Error;

/// Result type for peripheral operations
pub type PeripheralResult<T> = Result<T, PeripheralError>;

/// Result type returned by radio engine implementations
pub type EngineResult<T> = Result<T, EngineError>;

/// Help text surfaced when no radio engine is linked into the running binary
pub const LINKING_ERROR: &str = "The BLE radio engine doesn't seem to be linked. Make sure:\n\n\
    - The platform engine is compiled into this binary\n\
    - It is handed to PeripheralHost before any session is created\n";

/// A rejection produced by the radio engine.
///
/// Carried through every layer unchanged so the application sees exactly what the
/// engine reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub code: Option<String>,
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors that can occur while driving peripheral sessions
#[derive(Error, Debug)]
pub enum PeripheralError {
    #[error("{}", LINKING_ERROR)]
    EngineNotLinked,

    #[error("No tokio runtime available to drive peripheral creation")]
    NoRuntime,

    #[error("Payload decode failed: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl PeripheralError {
    /// The engine rejection, if this error came from the radio engine
    pub fn as_engine(&self) -> Option<&EngineError> {
        match self {
            PeripheralError::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<base64::DecodeError> for PeripheralError {
    fn from(err: base64::DecodeError) -> Self {
        PeripheralError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for PeripheralError {
    fn from(err: serde_json::Error) -> Self {
        PeripheralError::SerializationError(err.to_string())
    }
}
