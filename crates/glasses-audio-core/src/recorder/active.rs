use crate::{
    completion::{Completion, CompletionCell},
    model::{RecordingCompletion, RecordingRequest, RecordingSession, RecordingState},
    platform::AudioStream,
};

use std::{
    sync::{Mutex, MutexGuard},
    time::SystemTime,
};

use uuid::Uuid;

/// Why a recording stopped. The first reason recorded wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StopReason {
    Manual,
    DurationLimit,
    NotResumed,
    Shutdown,
    DeviceLost(String),
    WriterStopped,
}

/// Shared state of the one live recording.
pub(crate) struct ActiveRecording {
    pub(crate) id: Uuid,
    session: Mutex<RecordingSession>,
    pub(crate) completion: CompletionCell<RecordingCompletion>,
    stop: CompletionCell<StopReason>,
    /// Held while starting, pausing or stopping so interruption handling
    /// never races the hardware start.
    pub(crate) stream: Mutex<Option<Box<dyn AudioStream>>>,
}

impl ActiveRecording {
    pub(crate) fn new(request: &RecordingRequest) -> Self {
        let id = Uuid::new_v4();
        let (completion, _) = CompletionCell::new();
        let (stop, _) = CompletionCell::new();
        Self {
            id,
            session: Mutex::new(RecordingSession {
                id,
                output_path: request.output_path.clone(),
                source: request.source,
                started_at: SystemTime::now(),
                duration_limit: request.duration_limit,
                state: RecordingState::Connecting,
                paused: false,
            }),
            completion,
            stop,
            stream: Mutex::new(None),
        }
    }

    pub(crate) fn snapshot(&self) -> RecordingSession {
        self.session_guard().clone()
    }

    pub(crate) fn state(&self) -> RecordingState {
        self.session_guard().state
    }

    pub(crate) fn set_state(&self, state: RecordingState) {
        self.session_guard().state = state;
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.session_guard().paused
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.session_guard().paused = paused;
    }

    /// Record a stop reason. Returns `false` if another caller got there first.
    pub(crate) fn request_stop(&self, reason: StopReason) -> bool {
        self.stop.complete(reason)
    }

    pub(crate) fn stop_reason(&self) -> Option<StopReason> {
        self.stop.get()
    }

    pub(crate) fn stop_signal(&self) -> Completion<StopReason> {
        self.stop.subscribe()
    }

    pub(crate) fn stream_guard(&self) -> MutexGuard<'_, Option<Box<dyn AudioStream>>> {
        self.stream.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn session_guard(&self) -> MutexGuard<'_, RecordingSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}
