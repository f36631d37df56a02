use crate::{AudioError, ErrorCode};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal error payload delivered through the same channel as success.
///
/// Unlike [`AudioError`] this is `Clone`, so one failure can be handed to
/// every waiter of a session and to event subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    /// Error kind.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl OperationFailure {
    /// Build a failure from a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The session was dropped before it produced a result.
    pub fn no_result() -> Self {
        Self::new(ErrorCode::DeviceUnavailable, "session ended without a result")
    }
}

impl From<AudioError> for OperationFailure {
    fn from(error: AudioError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

impl From<&AudioError> for OperationFailure {
    fn from(error: &AudioError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for OperationFailure {}
