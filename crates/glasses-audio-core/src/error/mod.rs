mod error_code;
mod operation_failure;

pub use {error_code::ErrorCode, operation_failure::OperationFailure};

use crate::{model::Permission, platform::PlatformError};

use std::{panic::Location, path::PathBuf};

use error_location::ErrorLocation;
use thiserror::Error;

/// Engine errors with source location tracking.
///
/// Every native failure is converted into one of these variants at the
/// component boundary; callers of the event bridge never see a
/// [`PlatformError`].
#[derive(Error, Debug)]
pub enum AudioError {
    /// A recording session is already live.
    #[error("A recording session is already active {location}")]
    AlreadyRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A playback session is already live.
    #[error("A playback session is already active {location}")]
    AlreadyPlaying {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A required runtime permission has not been granted.
    #[error("Permission denied: {permission} {location}")]
    PermissionDenied {
        /// The missing permission.
        permission: Permission,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No usable hardware route for the operation.
    #[error("Audio device unavailable: {reason} {location}")]
    DeviceUnavailable {
        /// Description of what was missing.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The platform audio session could not be configured.
    #[error("Audio session configuration failed: {reason} {location}")]
    SessionConfigurationFailed {
        /// Description of the configuration failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Reading or writing an audio file failed.
    #[error("File I/O failed for {path:?}: {source} {location}")]
    FileIoFailed {
        /// File the operation was working on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A WAV file could not be decoded.
    #[error("Decode failed: {reason} {location}")]
    DecodeFailed {
        /// Description of the malformed content.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An OS interruption ended without permission to resume.
    #[error("Interrupted and not resumed {location}")]
    InterruptedAndNotResumed {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl AudioError {
    /// Stable code identifying the error kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            AudioError::AlreadyRecording { .. } => ErrorCode::AlreadyRecording,
            AudioError::AlreadyPlaying { .. } => ErrorCode::AlreadyPlaying,
            AudioError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            AudioError::DeviceUnavailable { .. } => ErrorCode::DeviceUnavailable,
            AudioError::SessionConfigurationFailed { .. } => ErrorCode::SessionConfigurationFailed,
            AudioError::FileIoFailed { .. } => ErrorCode::FileIoFailed,
            AudioError::DecodeFailed { .. } => ErrorCode::DecodeFailed,
            AudioError::InterruptedAndNotResumed { .. } => ErrorCode::InterruptedAndNotResumed,
        }
    }

    #[track_caller]
    pub(crate) fn permission_denied(permission: Permission) -> Self {
        AudioError::PermissionDenied {
            permission,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn device_unavailable(reason: impl Into<String>) -> Self {
        AudioError::DeviceUnavailable {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn session_failed(reason: impl Into<String>) -> Self {
        AudioError::SessionConfigurationFailed {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AudioError::FileIoFailed {
            path: path.into(),
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn decode_failed(reason: impl Into<String>) -> Self {
        AudioError::DecodeFailed {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Convert a native stream/device failure.
    #[track_caller]
    pub(crate) fn from_device(source: PlatformError) -> Self {
        Self::device_unavailable(source.to_string())
    }

    /// Convert a native session/mode/SCO failure.
    #[track_caller]
    pub(crate) fn from_session(source: PlatformError) -> Self {
        Self::session_failed(source.to_string())
    }
}

/// Result type alias using [`AudioError`].
pub type Result<T> = std::result::Result<T, AudioError>;
