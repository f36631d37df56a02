use crate::{
    interruption::{InterruptionSnapshot, InterruptionState},
    platform::{AudioPlatform, PlatformEvent},
    player::Player,
    recorder::Recorder,
    session::AudioSessionController,
};

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, info, instrument, warn};

/// Pauses and resumes the Recorder and Player around OS interruptions.
///
/// `NORMAL → INTERRUPTED` pauses whatever is running and remembers to resume
/// it. `INTERRUPTED → NORMAL` reactivates the session and, when the OS allows
/// it, resumes; the resume flag is cleared only after every paused component
/// confirmed, so a later end event can retry.
pub struct InterruptionCoordinator {
    platform: Arc<dyn AudioPlatform>,
    sessions: Arc<AudioSessionController>,
    recorder: Arc<Recorder>,
    player: Arc<Player>,
    state: InterruptionState,
    transition: tokio::sync::Mutex<()>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl InterruptionCoordinator {
    /// Coordinator owning the mutation of `state`.
    pub fn new(
        platform: Arc<dyn AudioPlatform>,
        sessions: Arc<AudioSessionController>,
        recorder: Arc<Recorder>,
        player: Arc<Player>,
        state: InterruptionState,
    ) -> Self {
        Self {
            platform,
            sessions,
            recorder,
            player,
            state,
            transition: tokio::sync::Mutex::new(()),
            listener: Mutex::new(None),
        }
    }

    /// Current flags.
    pub fn snapshot(&self) -> InterruptionSnapshot {
        self.state.snapshot()
    }

    /// Follow interruption notifications from the platform.
    pub fn start(self: &Arc<Self>) {
        self.stop();

        let mut events = self.platform.subscribe();
        let coordinator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(PlatformEvent::InterruptionBegan) => coordinator.begin_interruption().await,
                    Ok(PlatformEvent::InterruptionEnded { should_resume }) => {
                        coordinator.end_interruption(should_resume).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Interruption notifications lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Interruption listener finished");
        });

        *self.listener_slot() = Some(handle);
    }

    /// Stop following platform notifications.
    pub fn stop(&self) {
        if let Some(handle) = self.listener_slot().take() {
            handle.abort();
        }
    }

    /// The OS took the audio device.
    #[instrument(skip(self))]
    pub async fn begin_interruption(&self) {
        let _transition = self.transition.lock().await;

        if self.state.is_interrupted() {
            debug!("Already interrupted");
            return;
        }
        // Flag first: a start racing this transition sees it and defers.
        self.state.set_interrupted(true);

        let recorder_paused = self.recorder.pause_for_interruption();
        let player_paused = self.player.pause_for_interruption();
        if recorder_paused || player_paused {
            self.state.set_should_resume(true);
        }

        info!(recorder_paused, player_paused, "Audio interruption began");
    }

    /// The OS released the audio device.
    #[instrument(skip(self))]
    pub async fn end_interruption(&self, should_resume: bool) {
        let _transition = self.transition.lock().await;

        if !should_resume {
            self.state.set_interrupted(false);
            let abandoned = self.recorder.abandon_after_interruption();
            if self.state.snapshot().should_resume_after_interruption {
                self.state.set_should_resume(false);
            }
            info!(abandoned, "Audio interruption ended without resume");
            return;
        }

        let reactivated = match self.sessions.reactivate().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Session reactivation failed");
                false
            }
        };
        self.state.set_interrupted(false);

        if !self.state.snapshot().should_resume_after_interruption {
            info!("Audio interruption ended, nothing to resume");
            return;
        }
        if !reactivated {
            // Leave the flag set so the next end event retries.
            return;
        }

        let recorder = self.recorder.resume_after_interruption();
        let player = self.player.resume_after_interruption();
        match (recorder, player) {
            (Ok(recorder_resumed), Ok(player_resumed)) => {
                self.state.set_should_resume(false);
                info!(recorder_resumed, player_resumed, "Resumed after interruption");
            }
            (recorder, player) => {
                if let Err(e) = recorder {
                    warn!(error = %e, "Recorder resume failed, will retry");
                }
                if let Err(e) = player {
                    warn!(error = %e, "Player resume failed, will retry");
                }
            }
        }
    }

    fn listener_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for InterruptionCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
