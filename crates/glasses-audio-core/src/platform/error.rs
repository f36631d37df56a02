use error_location::ErrorLocation;
use thiserror::Error;

/// Errors raised by native adapters.
///
/// Engine components convert these into [`AudioError`](crate::AudioError)
/// before anything reaches the caller.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The requested device is not attached.
    #[error("Device not found: {reason} {location}")]
    DeviceNotFound {
        /// Which device was missing.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Device enumeration failed.
    #[error("Device enumeration failed: {reason} {location}")]
    Enumeration {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Session, mode or SCO request rejected.
    #[error("Session request failed: {reason} {location}")]
    Session {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Stream build, start, pause or runtime failure.
    #[error("Stream error: {reason} {location}")]
    Stream {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`PlatformError`].
pub type Result<T> = std::result::Result<T, PlatformError>;
