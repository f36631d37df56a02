use crate::{
    completion::{Completion, CompletionCell},
    model::{PlaybackCompletion, PlaybackSession, PlaybackState},
    platform::AudioStream,
    player::RenderBuffer,
};

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use uuid::Uuid;

/// Why a playback ended early. The first reason recorded wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlaybackStop {
    Stopped,
    DeviceLost(String),
}

struct Flags {
    state: PlaybackState,
    paused_by_interruption: bool,
}

/// Shared state of the one live playback.
pub(crate) struct ActivePlayback {
    pub(crate) id: Uuid,
    source_path: PathBuf,
    flags: Mutex<Flags>,
    pub(crate) buffer: Arc<RenderBuffer>,
    stream: Mutex<Option<Box<dyn AudioStream>>>,
    pub(crate) completion: CompletionCell<PlaybackCompletion>,
    stop: CompletionCell<PlaybackStop>,
}

impl ActivePlayback {
    pub(crate) fn new(source_path: &Path) -> Self {
        let (completion, _) = CompletionCell::new();
        let (stop, _) = CompletionCell::new();
        Self {
            id: Uuid::new_v4(),
            source_path: source_path.to_path_buf(),
            flags: Mutex::new(Flags {
                state: PlaybackState::Preparing,
                paused_by_interruption: false,
            }),
            buffer: Arc::new(RenderBuffer::default()),
            stream: Mutex::new(None),
            completion,
            stop,
        }
    }

    pub(crate) fn snapshot(&self) -> PlaybackSession {
        PlaybackSession {
            source_path: self.source_path.clone(),
            state: self.state(),
            progress_fraction: self.buffer.progress(),
        }
    }

    pub(crate) fn state(&self) -> PlaybackState {
        self.flags_guard().state
    }

    pub(crate) fn set_state(&self, state: PlaybackState) {
        self.flags_guard().state = state;
    }

    pub(crate) fn paused_by_interruption(&self) -> bool {
        self.flags_guard().paused_by_interruption
    }

    pub(crate) fn set_paused_by_interruption(&self, paused: bool) {
        self.flags_guard().paused_by_interruption = paused;
    }

    pub(crate) fn request_stop(&self, reason: PlaybackStop) -> bool {
        self.stop.complete(reason)
    }

    pub(crate) fn stop_reason(&self) -> Option<PlaybackStop> {
        self.stop.get()
    }

    pub(crate) fn stop_signal(&self) -> Completion<PlaybackStop> {
        self.stop.subscribe()
    }

    pub(crate) fn stream_guard(&self) -> MutexGuard<'_, Option<Box<dyn AudioStream>>> {
        self.stream.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flags_guard(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(|e| e.into_inner())
    }
}
