use crate::OperationFailure;

use std::time::SystemTime;

/// Spoken notification waiting for the app to return to the foreground.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSpeechRequest {
    /// Text to synthesise.
    pub text: String,
    /// When the request was queued.
    pub enqueued_at: SystemTime,
}

/// What `speak` did with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechDisposition {
    /// Synthesised and played to completion.
    Spoken,
    /// Held until the next foreground transition.
    Deferred {
        /// Queue length after the request was appended.
        queue_len: usize,
    },
}

/// A queued item whose synthesis or playback failed during a flush.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechFailure {
    /// Text of the failed item.
    pub text: String,
    /// Why it failed.
    pub failure: OperationFailure,
}
