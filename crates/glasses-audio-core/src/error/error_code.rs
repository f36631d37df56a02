use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, serialisable identifier for each [`AudioError`](crate::AudioError) kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A recording session is already live.
    AlreadyRecording,
    /// A playback session is already live.
    AlreadyPlaying,
    /// A runtime permission is missing.
    PermissionDenied,
    /// No usable hardware route.
    DeviceUnavailable,
    /// Platform session configuration failed.
    SessionConfigurationFailed,
    /// File read/write failed.
    FileIoFailed,
    /// Malformed WAV content.
    DecodeFailed,
    /// Interruption ended without resume.
    InterruptedAndNotResumed,
}

impl ErrorCode {
    /// Wire representation of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AlreadyRecording => "ALREADY_RECORDING",
            ErrorCode::AlreadyPlaying => "ALREADY_PLAYING",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::DeviceUnavailable => "DEVICE_UNAVAILABLE",
            ErrorCode::SessionConfigurationFailed => "SESSION_CONFIGURATION_FAILED",
            ErrorCode::FileIoFailed => "FILE_IO_FAILED",
            ErrorCode::DecodeFailed => "DECODE_FAILED",
            ErrorCode::InterruptedAndNotResumed => "INTERRUPTED_AND_NOT_RESUMED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
