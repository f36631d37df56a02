use crate::OperationFailure;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lifecycle of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No session.
    Idle,
    /// File decoded, route being prepared.
    Preparing,
    /// Rendering.
    Playing,
    /// Held by `pause` or an interruption.
    Paused,
    /// Hard-stopped by the caller.
    Stopped,
    /// Played to the end.
    Completed,
    /// Terminated with an error.
    Failed,
}

impl PlaybackState {
    /// The session can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PlaybackState::Stopped | PlaybackState::Completed | PlaybackState::Failed
        )
    }
}

/// Snapshot of the live (or last) playback session.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    /// File being played.
    pub source_path: PathBuf,
    /// Current lifecycle state.
    pub state: PlaybackState,
    /// Rendered fraction, `0.0..=1.0`.
    pub progress_fraction: f32,
}

/// How a playback ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackOutcome {
    /// Every frame was rendered.
    Completed,
    /// Stopped early by the caller or by teardown.
    Stopped,
}

/// Terminal result shared by every waiter of one session.
pub type PlaybackCompletion = Result<PlaybackOutcome, OperationFailure>;

/// Playback status event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    /// Audio is being rendered.
    pub is_playing: bool,
    /// Lifecycle state at the time of the event.
    pub state: PlaybackState,
    /// Rendered fraction, `0.0..=1.0`.
    pub progress: f32,
    /// Set on the terminal event of a failed session.
    pub error: Option<OperationFailure>,
}
