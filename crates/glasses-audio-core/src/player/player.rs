use crate::{
    AudioError, CoreResult, EngineConfig, OperationFailure,
    completion::Completion,
    interruption::InterruptionState,
    model::{
        PlaybackCompletion, PlaybackOutcome, PlaybackSession, PlaybackState, PlaybackStatus,
        SourcePreference,
    },
    platform::{AudioPlatform, PlatformError, StreamFormat, run_blocking},
    player::{ActivePlayback, PlaybackStop, convert_for_render, load_wav},
    session::{AudioSessionController, SessionLease, SessionPurpose},
    wav::DecodedWav,
};

use std::{
    panic::Location,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use error_location::ErrorLocation;
use tokio::{
    sync::{broadcast, mpsc::unbounded_channel},
    time::{MissedTickBehavior, interval},
};
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

const STATUS_CAPACITY: usize = 64;

/// Plays WAV files through the routed output.
///
/// The file header decides the format; decoded audio is remixed and
/// resampled to whatever the render stream accepts. Every call to
/// [`play_audio`](Self::play_audio) produces exactly one terminal
/// [`PlaybackStatus`].
pub struct Player {
    platform: Arc<dyn AudioPlatform>,
    sessions: Arc<AudioSessionController>,
    interruption: InterruptionState,
    config: EngineConfig,
    current: Mutex<Option<Arc<ActivePlayback>>>,
    status: broadcast::Sender<PlaybackStatus>,
}

impl Player {
    /// Player drawing sessions from `sessions`.
    pub fn new(
        platform: Arc<dyn AudioPlatform>,
        sessions: Arc<AudioSessionController>,
        interruption: InterruptionState,
        config: &EngineConfig,
    ) -> Self {
        let (status, _) = broadcast::channel(STATUS_CAPACITY);
        Self {
            platform,
            sessions,
            interruption,
            config: config.clone(),
            current: Mutex::new(None),
            status,
        }
    }

    /// Status transitions and periodic progress.
    pub fn on_status(&self) -> broadcast::Receiver<PlaybackStatus> {
        self.status.subscribe()
    }

    /// Live (or last) session.
    pub fn session(&self) -> Option<PlaybackSession> {
        self.current_slot().as_ref().map(|a| a.snapshot())
    }

    /// State of the live (or last) session, `Idle` if none ever ran.
    pub fn state(&self) -> PlaybackState {
        self.current_slot()
            .as_ref()
            .map_or(PlaybackState::Idle, |a| a.state())
    }

    /// Rendered fraction of the live (or last) session, `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        self.current_slot()
            .as_ref()
            .map_or(0.0, |a| a.buffer.progress())
    }

    /// Decode `path` and start playing it.
    ///
    /// Missing or malformed files fail here with `FileIoFailed` or
    /// `DecodeFailed` before any session is configured; the failure is also
    /// published as the session's terminal status.
    #[instrument(skip(self))]
    pub async fn play_audio(
        self: &Arc<Self>,
        path: &Path,
        preference: SourcePreference,
    ) -> CoreResult<Completion<PlaybackCompletion>> {
        let active = self.reserve(path)?;

        let prepared = match load_wav(path).await {
            Ok(audio) => self
                .sessions
                .check_permissions(preference, SessionPurpose::Playback)
                .map(|()| audio),
            Err(e) => Err(e),
        };
        let audio = match prepared {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "Playback rejected");
                let failure = OperationFailure::from(&e);
                self.finish(&active, Err(failure));
                return Err(e);
            }
        };

        info!(
            session_id = %active.id,
            sample_rate = audio.format.sample_rate,
            channels = audio.format.channels,
            frames = audio.frames(),
            "Playback accepted"
        );
        let completion = active.completion.subscribe();

        let player = Arc::clone(self);
        let span = info_span!("playback", session_id = %active.id);
        tokio::spawn(player.drive(active, audio, preference).instrument(span));

        Ok(completion)
    }

    /// Hard stop; waits for the session to release. `None` if nothing ever played.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Option<PlaybackCompletion> {
        let active = self.current_slot().clone()?;
        if active.request_stop(PlaybackStop::Stopped) {
            info!(session_id = %active.id, "Playback stop requested");
        }
        active.completion.subscribe().wait().await
    }

    /// Hold rendering. Returns `false` when nothing is playing.
    pub fn pause(&self) -> bool {
        let Some(active) = self.current_slot().clone() else {
            return false;
        };
        let paused = Self::hold(&active);
        if paused {
            info!(session_id = %active.id, "Playback paused");
            self.publish(&active, None);
        }
        paused
    }

    /// Continue a paused session. No-op while interrupted or when not paused.
    pub fn resume(&self) -> CoreResult<bool> {
        let Some(active) = self.current_slot().clone() else {
            return Ok(false);
        };
        if self.interruption.is_interrupted() {
            debug!("Resume ignored during interruption");
            return Ok(false);
        }
        let resumed = Self::continue_rendering(&active)?;
        if resumed {
            active.set_paused_by_interruption(false);
            info!(session_id = %active.id, "Playback resumed");
            self.publish(&active, None);
        }
        Ok(resumed)
    }

    pub(crate) fn pause_for_interruption(&self) -> bool {
        let Some(active) = self.current_slot().clone() else {
            return false;
        };
        let paused = Self::hold(&active);
        if paused {
            active.set_paused_by_interruption(true);
            info!(session_id = %active.id, "Playback paused by interruption");
            self.publish(&active, None);
        }
        paused
    }

    pub(crate) fn resume_after_interruption(&self) -> CoreResult<bool> {
        let Some(active) = self.current_slot().clone() else {
            return Ok(false);
        };
        if !active.paused_by_interruption() {
            return Ok(false);
        }
        let resumed = Self::continue_rendering(&active)?;
        if resumed {
            active.set_paused_by_interruption(false);
            info!(session_id = %active.id, "Playback resumed after interruption");
            self.publish(&active, None);
        }
        Ok(resumed)
    }

    fn hold(active: &ActivePlayback) -> bool {
        let mut stream = active.stream_guard();
        if active.state() != PlaybackState::Playing {
            return false;
        }
        let Some(stream) = stream.as_mut() else {
            return false;
        };
        match stream.pause() {
            Ok(()) => {
                active.set_state(PlaybackState::Paused);
                true
            }
            Err(e) => {
                warn!(session_id = %active.id, error = %e, "Failed to pause render stream");
                false
            }
        }
    }

    fn continue_rendering(active: &ActivePlayback) -> CoreResult<bool> {
        let mut stream = active.stream_guard();
        if active.state() != PlaybackState::Paused {
            return Ok(false);
        }
        let Some(stream) = stream.as_mut() else {
            return Ok(false);
        };
        stream.start().map_err(AudioError::from_device)?;
        active.set_state(PlaybackState::Playing);
        Ok(true)
    }

    #[track_caller]
    fn reserve(&self, path: &Path) -> CoreResult<Arc<ActivePlayback>> {
        let mut current = self.current_slot();
        if current.as_ref().is_some_and(|a| !a.state().is_terminal()) {
            warn!("Playback already in progress");
            return Err(AudioError::AlreadyPlaying {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        let active = Arc::new(ActivePlayback::new(path));
        *current = Some(Arc::clone(&active));
        Ok(active)
    }

    async fn drive(
        self: Arc<Self>,
        active: Arc<ActivePlayback>,
        audio: DecodedWav,
        preference: SourcePreference,
    ) {
        let result = self.play(&active, audio, preference).await;
        let completion = match result {
            Ok(outcome) => {
                info!(?outcome, "Playback finished");
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "Playback failed");
                Err(OperationFailure::from(e))
            }
        };
        self.finish(&active, completion);
    }

    /// Set the terminal state, publish the terminal status once, resolve waiters.
    fn finish(&self, active: &ActivePlayback, completion: PlaybackCompletion) {
        let (state, error) = match &completion {
            Ok(PlaybackOutcome::Completed) => (PlaybackState::Completed, None),
            Ok(PlaybackOutcome::Stopped) => (PlaybackState::Stopped, None),
            Err(failure) => (PlaybackState::Failed, Some(failure.clone())),
        };
        active.set_state(state);
        self.publish(active, error);
        active.completion.complete(completion);
    }

    async fn play(
        &self,
        active: &Arc<ActivePlayback>,
        audio: DecodedWav,
        preference: SourcePreference,
    ) -> CoreResult<PlaybackOutcome> {
        let lease = self
            .sessions
            .acquire(preference, SessionPurpose::Playback)
            .await?;

        let result = self.render(active, audio, &lease).await;

        // Stop the stream, drop the callback, then give the session back.
        let mut first_error = None;
        let stream = active.stream_guard().take();
        if let Some(mut stream) = stream {
            if let Err(e) = stream.stop() {
                first_error = Some(AudioError::from_device(e));
            }
        }
        if let Err(e) = self.sessions.release(lease).await {
            warn!(error = %e, "Session release failed after playback");
            first_error.get_or_insert(e);
        }

        let outcome = result?;
        match first_error {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    async fn render(
        &self,
        active: &Arc<ActivePlayback>,
        audio: DecodedWav,
        lease: &SessionLease,
    ) -> CoreResult<PlaybackOutcome> {
        let requested = StreamFormat {
            sample_rate: audio.format.sample_rate,
            channels: audio.format.channels,
        };
        let buffer = Arc::clone(&active.buffer);
        let (error_tx, mut error_rx) = unbounded_channel::<PlatformError>();
        let device = lease.output.clone();

        let stream = run_blocking(&self.platform, move |p| {
            p.open_render(
                device.as_ref(),
                requested,
                Box::new(move |out: &mut [f32]| buffer.fill(out)),
                Box::new(move |e| {
                    let _ = error_tx.send(e);
                }),
            )
        })
        .await
        .map_err(AudioError::from_device)?;

        let actual = stream.format();
        *active.stream_guard() = Some(stream);

        let samples = tokio::task::spawn_blocking(move || convert_for_render(audio, actual))
            .await
            .map_err(|e| AudioError::decode_failed(format!("conversion task failed: {}", e)))??;
        let frames = active.buffer.load(samples, usize::from(actual.channels));
        debug!(
            sample_rate = actual.sample_rate,
            channels = actual.channels,
            frames,
            "Render buffer loaded"
        );

        if frames == 0 {
            return Ok(PlaybackOutcome::Completed);
        }

        let mut stop = active.stop_signal();

        loop {
            tokio::select! {
                biased;
                _ = stop.wait() => return self.early_exit(active),
                _ = self.interruption.wait_until_clear() => {}
            }

            let started = {
                let mut stream = active.stream_guard();
                if self.interruption.is_interrupted() {
                    false
                } else {
                    if let Some(stream) = stream.as_mut() {
                        stream.start().map_err(AudioError::from_device)?;
                    }
                    active.set_state(PlaybackState::Playing);
                    true
                }
            };
            if started {
                break;
            }
        }
        info!("Playback started");
        self.publish(active, None);

        let mut ticker = interval(self.config.progress_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = active.buffer.finished() => return Ok(PlaybackOutcome::Completed),
                _ = stop.wait() => return self.early_exit(active),
                Some(e) = error_rx.recv() => {
                    error!(error = %e, "Render stream failed");
                    active.request_stop(PlaybackStop::DeviceLost(e.to_string()));
                    return self.early_exit(active);
                }
                _ = ticker.tick() => self.publish(active, None),
            }
        }
    }

    fn early_exit(&self, active: &ActivePlayback) -> CoreResult<PlaybackOutcome> {
        match active.stop_reason() {
            Some(PlaybackStop::DeviceLost(reason)) => Err(AudioError::device_unavailable(reason)),
            _ => Ok(PlaybackOutcome::Stopped),
        }
    }

    fn publish(&self, active: &ActivePlayback, error: Option<OperationFailure>) {
        let state = active.state();
        let _ = self.status.send(PlaybackStatus {
            is_playing: state == PlaybackState::Playing,
            state,
            progress: active.buffer.progress(),
            error,
        });
    }

    fn current_slot(&self) -> MutexGuard<'_, Option<Arc<ActivePlayback>>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
