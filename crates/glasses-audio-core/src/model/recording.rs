use crate::{OperationFailure, SourcePreference};

use std::{
    path::PathBuf,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No session.
    Idle,
    /// Session accepted, route and hardware being prepared.
    Connecting,
    /// Capture running (or paused by an interruption).
    Recording,
    /// Stop requested, resources being released.
    Stopping,
    /// File finalised and hardware released.
    Completed,
    /// Terminated with an error.
    Failed,
}

impl RecordingState {
    /// The session can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordingState::Completed | RecordingState::Failed)
    }
}

/// Parameters of a `startRecording` call.
#[derive(Debug, Clone)]
pub struct RecordingRequest {
    /// Where the WAV file is written.
    pub output_path: PathBuf,
    /// Stop automatically after this long.
    pub duration_limit: Option<Duration>,
    /// Hardware preference.
    pub source: SourcePreference,
}

impl RecordingRequest {
    /// Duration limit for `seconds`. Zero, negative, non-finite and
    /// unrepresentable values mean no limit.
    pub fn limit_from_seconds(seconds: f64) -> Option<Duration> {
        if seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).ok()
        } else {
            None
        }
    }
}

/// Snapshot of the live (or last) recording session.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    /// Correlation id used in logs and events.
    pub id: Uuid,
    /// Where the WAV file is written.
    pub output_path: PathBuf,
    /// Hardware preference.
    pub source: SourcePreference,
    /// When the session was accepted.
    pub started_at: SystemTime,
    /// Automatic stop limit.
    pub duration_limit: Option<Duration>,
    /// Current lifecycle state.
    pub state: RecordingState,
    /// Capture is held by an interruption.
    pub paused: bool,
}

/// Successful result of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOutcome {
    /// Location of the finalised WAV file.
    pub output_path: PathBuf,
    /// Audio length in seconds.
    pub duration_seconds: f64,
    /// File size in bytes, header included.
    pub byte_size: u64,
}

/// Terminal result shared by every waiter of one session.
pub type RecordingCompletion = Result<RecordingOutcome, OperationFailure>;

/// Periodic recording telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingProgress {
    /// Session the sample belongs to.
    pub session_id: Uuid,
    /// Capture is running.
    pub is_recording: bool,
    /// Seconds of audio written so far.
    pub duration: f64,
    /// RMS level of the most recent window, `0.0..=1.0`.
    pub level: f32,
}
