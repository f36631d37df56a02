use crate::{
    AudioError, CoreResult, EngineConfig, OperationFailure,
    audio::FormatConverter,
    completion::Completion,
    interruption::InterruptionState,
    model::{
        RecordingCompletion, RecordingOutcome, RecordingProgress, RecordingRequest,
        RecordingSession, RecordingState,
    },
    platform::{AudioPlatform, PlatformError, run_blocking},
    recorder::{ActiveRecording, CaptureResources, CaptureStats, StopReason, run_writer},
    session::{AudioSessionController, SessionPurpose},
    wav::{WavFileWriter, WavFormat},
};

use std::{
    panic::Location,
    sync::{Arc, Mutex, MutexGuard, mpsc},
};

use error_location::ErrorLocation;
use tokio::{
    sync::{Notify, broadcast, mpsc::unbounded_channel},
    time::{Instant, MissedTickBehavior, interval, sleep_until},
};
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

const PROGRESS_CAPACITY: usize = 64;

/// Captures live audio into a 16 kHz mono 16-bit WAV file.
///
/// At most one session is live at a time. `start_recording` returns as soon
/// as the session is accepted; the terminal result arrives through the
/// returned [`Completion`], which every later `stop_recording` also observes.
pub struct Recorder {
    platform: Arc<dyn AudioPlatform>,
    sessions: Arc<AudioSessionController>,
    interruption: InterruptionState,
    config: EngineConfig,
    current: Mutex<Option<Arc<ActiveRecording>>>,
    progress: broadcast::Sender<RecordingProgress>,
}

impl Recorder {
    /// Recorder drawing sessions from `sessions`.
    pub fn new(
        platform: Arc<dyn AudioPlatform>,
        sessions: Arc<AudioSessionController>,
        interruption: InterruptionState,
        config: &EngineConfig,
    ) -> Self {
        let (progress, _) = broadcast::channel(PROGRESS_CAPACITY);
        Self {
            platform,
            sessions,
            interruption,
            config: config.clone(),
            current: Mutex::new(None),
            progress,
        }
    }

    /// Periodic progress while a session is live, plus one final sample.
    pub fn on_progress(&self) -> broadcast::Receiver<RecordingProgress> {
        self.progress.subscribe()
    }

    /// Live (or last) session.
    pub fn session(&self) -> Option<RecordingSession> {
        self.current_slot().as_ref().map(|a| a.snapshot())
    }

    /// State of the live (or last) session, `Idle` if none ever ran.
    pub fn state(&self) -> RecordingState {
        self.current_slot()
            .as_ref()
            .map_or(RecordingState::Idle, |a| a.state())
    }

    /// Accept a new recording session.
    ///
    /// Fails with `AlreadyRecording` (leaving the live session untouched) or
    /// `PermissionDenied`; everything else is reported through the completion.
    #[track_caller]
    #[instrument(skip(self, request), fields(path = ?request.output_path, source = %request.source))]
    pub fn start_recording(
        self: &Arc<Self>,
        request: RecordingRequest,
    ) -> CoreResult<Completion<RecordingCompletion>> {
        let active = {
            let mut current = self.current_slot();
            if current.as_ref().is_some_and(|a| !a.state().is_terminal()) {
                warn!("Recording already in progress");
                return Err(AudioError::AlreadyRecording {
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            self.sessions
                .check_permissions(request.source, SessionPurpose::Recording)?;

            let active = Arc::new(ActiveRecording::new(&request));
            *current = Some(Arc::clone(&active));
            active
        };

        info!(session_id = %active.id, "Recording session accepted");
        let completion = active.completion.subscribe();

        let recorder = Arc::clone(self);
        let span = info_span!("recording", session_id = %active.id);
        tokio::spawn(recorder.drive(active, request).instrument(span));

        Ok(completion)
    }

    /// Stop the live session and wait for its result.
    ///
    /// Idempotent: the first caller triggers the stop, later callers (and the
    /// duration timer, if it lost the race) only observe the same result.
    /// Returns `None` when no session has ever been started.
    #[instrument(skip(self))]
    pub async fn stop_recording(&self) -> Option<RecordingCompletion> {
        self.stop_with(StopReason::Manual).await
    }

    pub(crate) async fn shutdown(&self) -> Option<RecordingCompletion> {
        self.stop_with(StopReason::Shutdown).await
    }

    async fn stop_with(&self, reason: StopReason) -> Option<RecordingCompletion> {
        let active = self.current_slot().clone()?;
        if active.request_stop(reason) {
            info!(session_id = %active.id, "Stop requested");
        } else {
            debug!(session_id = %active.id, "Stop already requested, awaiting result");
        }
        active.completion.subscribe().wait().await
    }

    /// Hold capture for an interruption. Returns whether anything was paused.
    pub(crate) fn pause_for_interruption(&self) -> bool {
        let Some(active) = self.current_slot().clone() else {
            return false;
        };
        let mut stream = active.stream_guard();
        if active.state() != RecordingState::Recording || active.is_paused() {
            return false;
        }
        let Some(stream) = stream.as_mut() else {
            return false;
        };
        match stream.pause() {
            Ok(()) => {
                active.set_paused(true);
                info!(session_id = %active.id, "Recording paused by interruption");
                true
            }
            Err(e) => {
                warn!(session_id = %active.id, error = %e, "Failed to pause capture");
                false
            }
        }
    }

    /// Resume capture held by an interruption. `Ok(false)` when nothing was held.
    pub(crate) fn resume_after_interruption(&self) -> CoreResult<bool> {
        let Some(active) = self.current_slot().clone() else {
            return Ok(false);
        };
        let mut stream = active.stream_guard();
        if !active.is_paused() || active.state() != RecordingState::Recording {
            return Ok(false);
        }
        let Some(stream) = stream.as_mut() else {
            return Ok(false);
        };
        stream.start().map_err(AudioError::from_device)?;
        active.set_paused(false);
        info!(session_id = %active.id, "Recording resumed after interruption");
        Ok(true)
    }

    /// The interruption ended without permission to resume: finish the file.
    pub(crate) fn abandon_after_interruption(&self) -> bool {
        let Some(active) = self.current_slot().clone() else {
            return false;
        };
        if !active.is_paused() {
            return false;
        }
        warn!(session_id = %active.id, "Interruption ended without resume, finalising");
        active.request_stop(StopReason::NotResumed)
    }

    async fn drive(self: Arc<Self>, active: Arc<ActiveRecording>, request: RecordingRequest) {
        let result = self.record(&active, &request).await;

        let completion: RecordingCompletion = match result {
            Ok(outcome) => {
                info!(
                    duration_seconds = outcome.duration_seconds,
                    byte_size = outcome.byte_size,
                    "Recording completed"
                );
                active.set_state(RecordingState::Completed);
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "Recording failed");
                active.set_state(RecordingState::Failed);
                Err(OperationFailure::from(e))
            }
        };

        let duration = completion.as_ref().map_or(0.0, |o| o.duration_seconds);
        let _ = self.progress.send(RecordingProgress {
            session_id: active.id,
            is_recording: false,
            duration,
            level: 0.0,
        });

        active.completion.complete(completion);
    }

    async fn record(
        &self,
        active: &Arc<ActiveRecording>,
        request: &RecordingRequest,
    ) -> CoreResult<RecordingOutcome> {
        let lease = self
            .sessions
            .acquire(request.source, SessionPurpose::Recording)
            .await?;

        let mut resources = CaptureResources {
            active: Arc::clone(active),
            path: request.output_path.clone(),
            writer: None,
            lease: Some(lease),
        };

        let cause = match self.capture(active, request, &mut resources).await {
            Ok(cause) => cause,
            Err(e) => {
                active.request_stop(StopReason::Shutdown);
                active.set_state(RecordingState::Stopping);
                let released = resources.release(&self.sessions).await;
                if let Some(late) = released.error {
                    debug!(error = %late, "Additional release failure after capture error");
                }
                return Err(e);
            }
        };

        active.set_state(RecordingState::Stopping);
        info!(reason = ?cause, "Recording stopping");
        let released = resources.release(&self.sessions).await;

        match cause {
            StopReason::NotResumed => {
                return Err(AudioError::InterruptedAndNotResumed {
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            StopReason::DeviceLost(reason) => return Err(AudioError::device_unavailable(reason)),
            _ => {}
        }
        if let Some(e) = released.error {
            return Err(e);
        }

        let report = released.report.ok_or_else(|| {
            AudioError::device_unavailable("capture ended before any audio was written")
        })?;
        Ok(RecordingOutcome {
            output_path: request.output_path.clone(),
            duration_seconds: report.summary.frames as f64 / f64::from(report.sample_rate),
            byte_size: report.summary.file_len,
        })
    }

    /// Open the file and the capture stream, start once no interruption is
    /// in progress, then run until something asks to stop.
    async fn capture(
        &self,
        active: &Arc<ActiveRecording>,
        request: &RecordingRequest,
        resources: &mut CaptureResources,
    ) -> CoreResult<StopReason> {
        let target_rate = self.config.target_sample_rate;
        let path = request.output_path.clone();
        let writer = tokio::task::spawn_blocking({
            let path = path.clone();
            move || WavFileWriter::create(&path, WavFormat::pcm16_mono(target_rate))
        })
        .await
        .map_err(|e| AudioError::file_io(&path, std::io::Error::other(e.to_string())))?
        .map_err(|e| AudioError::file_io(&path, e))?;
        debug!(path = ?path, "Placeholder header written");

        let (buffer_tx, buffer_rx) = mpsc::channel::<Vec<f32>>();
        let (error_tx, mut error_rx) = unbounded_channel::<PlatformError>();
        let device = resources.lease.as_ref().and_then(|l| l.input.clone());

        let stream = run_blocking(&self.platform, move |p| {
            p.open_capture(
                device.as_ref(),
                target_rate,
                Box::new(move |data: &[f32]| {
                    let _ = buffer_tx.send(data.to_vec());
                }),
                Box::new(move |e| {
                    let _ = error_tx.send(e);
                }),
            )
        })
        .await
        .map_err(AudioError::from_device)?;

        let native = stream.format();
        info!(
            sample_rate = native.sample_rate,
            channels = native.channels,
            target_rate,
            "Capture stream opened"
        );
        *active.stream_guard() = Some(stream);

        let converter = FormatConverter::new(native, target_rate)?;
        let stats = Arc::new(CaptureStats::default());
        let writer_done = Arc::new(Notify::new());
        let sync_interval = self.config.header_sync_interval();
        resources.writer = Some(tokio::task::spawn_blocking({
            let stats = Arc::clone(&stats);
            let done = Arc::clone(&writer_done);
            move || run_writer(buffer_rx, writer, converter, stats, sync_interval, done)
        }));

        let mut stop = active.stop_signal();

        // Deferred start: never race the OS for the device during an interruption.
        loop {
            tokio::select! {
                biased;
                reason = stop.wait() => {
                    let reason = reason.unwrap_or(StopReason::Manual);
                    debug!(?reason, "Stopped before capture started");
                    return Ok(reason);
                }
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
                    active.set_state(RecordingState::Recording);
                    true
                }
            };
            if started {
                break;
            }
        }
        info!("Recording started");

        // A limit past the clock's range is no limit.
        let deadline = request
            .duration_limit
            .and_then(|limit| Instant::now().checked_add(limit));
        let limit = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(limit);

        let mut ticker = interval(self.config.progress_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stop.wait() => break,
                _ = &mut limit => {
                    if active.request_stop(StopReason::DurationLimit) {
                        info!("Duration limit reached");
                    }
                    break;
                }
                Some(e) = error_rx.recv() => {
                    error!(error = %e, "Capture stream failed");
                    active.request_stop(StopReason::DeviceLost(e.to_string()));
                    break;
                }
                _ = writer_done.notified() => {
                    active.request_stop(StopReason::WriterStopped);
                    break;
                }
                _ = ticker.tick() => {
                    self.publish_progress(active, &stats, target_rate);
                }
            }
        }

        Ok(active.stop_reason().unwrap_or(StopReason::Manual))
    }

    fn publish_progress(&self, active: &ActiveRecording, stats: &CaptureStats, rate: u32) {
        let progress = RecordingProgress {
            session_id: active.id,
            is_recording: active.state() == RecordingState::Recording && !active.is_paused(),
            duration: stats.frames() as f64 / f64::from(rate),
            level: stats.level(),
        };
        let _ = self.progress.send(progress);
    }

    fn current_slot(&self) -> MutexGuard<'_, Option<Arc<ActiveRecording>>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
