use crate::{
    CoreResult, EngineConfig, OperationFailure,
    completion::Completion,
    interruption::{InterruptionCoordinator, InterruptionState},
    model::{
        AppLifecycle, AudioRoute, PlaybackCompletion, PlaybackOutcome, PlaybackStatus,
        RecordingCompletion, RecordingOutcome, RecordingProgress, RecordingRequest, RouteWarning,
        SourcePreference, SpeechDisposition,
    },
    platform::AudioPlatform,
    player::Player,
    recorder::Recorder,
    route_monitor::RouteMonitor,
    session::AudioSessionController,
    speech::{DeferredSpeechQueue, FlushReport, SpeechSynthesizer},
};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const ROUTE_CAPACITY: usize = 32;

/// The single integration surface of the engine.
///
/// Request/response operations plus event subscriptions over the route
/// monitor, session controller, recorder, player, interruption coordinator
/// and deferred speech queue. Operations that wait for a terminal result
/// deliver failures through the same `Result` as success, as an
/// [`OperationFailure`].
pub struct EventBridge {
    platform: Arc<dyn AudioPlatform>,
    monitor: Arc<RouteMonitor>,
    sessions: Arc<AudioSessionController>,
    recorder: Arc<Recorder>,
    player: Arc<Player>,
    coordinator: Arc<InterruptionCoordinator>,
    speech: Arc<DeferredSpeechQueue>,
    routes: broadcast::Sender<AudioRoute>,
    output_dir: PathBuf,
}

impl EventBridge {
    /// Wire the engine over `platform`. Recordings without an explicit path
    /// land in `output_dir`. Call [`start`](Self::start) from a Tokio runtime.
    pub fn new(
        platform: Arc<dyn AudioPlatform>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: EngineConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let monitor = Arc::new(RouteMonitor::new(
            Arc::clone(&platform),
            config.route_poll_interval(),
        ));
        let sessions = Arc::new(AudioSessionController::new(
            Arc::clone(&platform),
            Arc::clone(&monitor),
            &config,
        ));
        let interruption = InterruptionState::new();
        let recorder = Arc::new(Recorder::new(
            Arc::clone(&platform),
            Arc::clone(&sessions),
            interruption.clone(),
            &config,
        ));
        let player = Arc::new(Player::new(
            Arc::clone(&platform),
            Arc::clone(&sessions),
            interruption.clone(),
            &config,
        ));
        let coordinator = Arc::new(InterruptionCoordinator::new(
            Arc::clone(&platform),
            Arc::clone(&sessions),
            Arc::clone(&recorder),
            Arc::clone(&player),
            interruption,
        ));
        let speech = Arc::new(DeferredSpeechQueue::new(
            Arc::clone(&player),
            synthesizer,
            config.speech_inter_item_delay(),
        ));
        let (routes, _) = broadcast::channel(ROUTE_CAPACITY);

        Self {
            platform,
            monitor,
            sessions,
            recorder,
            player,
            coordinator,
            speech,
            routes,
            output_dir: output_dir.into(),
        }
    }

    /// Start route monitoring and interruption handling.
    #[instrument(skip(self), fields(platform = self.platform.name()))]
    pub fn start(&self) {
        let routes = self.routes.clone();
        self.monitor.start(move |route| {
            let _ = routes.send(route);
        });
        self.coordinator.start();
        info!("Event bridge started");
    }

    /// Current route without blocking on enumeration.
    pub fn get_route(&self) -> AudioRoute {
        self.monitor.current_route()
    }

    /// Record into a fresh file in the output directory and wait for the result.
    ///
    /// `duration_seconds` of `None`, zero or less means no limit; the
    /// recording then runs until [`stop_recording`](Self::stop_recording).
    #[instrument(skip(self))]
    pub async fn start_recording(
        &self,
        duration_seconds: Option<f64>,
        source: Option<SourcePreference>,
    ) -> Result<RecordingOutcome, OperationFailure> {
        let request = RecordingRequest {
            output_path: self.output_dir.join(format!("recording-{}.wav", Uuid::new_v4())),
            duration_limit: duration_seconds.and_then(RecordingRequest::limit_from_seconds),
            source: source.unwrap_or_default(),
        };
        self.start_recording_to(request)?.outcome().await
    }

    /// Start a recording and return its completion without waiting.
    pub fn start_recording_to(
        &self,
        request: RecordingRequest,
    ) -> CoreResult<Completion<RecordingCompletion>> {
        self.recorder.start_recording(request)
    }

    /// Stop the live recording. Repeated calls return the same result;
    /// `Ok(None)` when nothing was ever recorded.
    #[instrument(skip(self))]
    pub async fn stop_recording(&self) -> Result<Option<RecordingOutcome>, OperationFailure> {
        self.recorder.stop_recording().await.transpose()
    }

    /// Play `path` on the routed output and wait until it ends.
    pub async fn play_audio(&self, path: &Path) -> Result<PlaybackOutcome, OperationFailure> {
        self.play_audio_with(path, SourcePreference::Auto).await
    }

    /// Play `path` with an explicit source preference and wait until it ends.
    #[instrument(skip(self))]
    pub async fn play_audio_with(
        &self,
        path: &Path,
        preference: SourcePreference,
    ) -> Result<PlaybackOutcome, OperationFailure> {
        self.start_playback(path, preference).await?.outcome().await
    }

    /// Start playback and return its completion without waiting.
    pub async fn start_playback(
        &self,
        path: &Path,
        preference: SourcePreference,
    ) -> CoreResult<Completion<PlaybackCompletion>> {
        self.player.play_audio(path, preference).await
    }

    /// Hard-stop playback.
    pub async fn stop_playback(&self) -> Result<Option<PlaybackOutcome>, OperationFailure> {
        self.player.stop().await.transpose()
    }

    /// Pause playback; `false` when nothing is playing.
    pub fn pause_playback(&self) -> bool {
        self.player.pause()
    }

    /// Resume paused playback; `false` when there was nothing to resume.
    pub fn resume_playback(&self) -> Result<bool, OperationFailure> {
        self.player.resume().map_err(OperationFailure::from)
    }

    /// Rendered fraction of the current playback.
    pub fn playback_progress(&self) -> f32 {
        self.player.progress()
    }

    /// Speak `text`, or queue it while the app is not in the foreground.
    pub async fn speak(&self, text: &str) -> Result<SpeechDisposition, OperationFailure> {
        self.speech.speak(text).await
    }

    /// Feed the host app's lifecycle; returning to the foreground flushes
    /// queued speech and yields the flush handle.
    pub fn set_app_lifecycle(&self, lifecycle: AppLifecycle) -> Option<JoinHandle<FlushReport>> {
        self.speech.set_lifecycle(lifecycle)
    }

    /// Route changes, plus the initial route when the bridge starts.
    pub fn on_route_change(&self) -> broadcast::Receiver<AudioRoute> {
        self.routes.subscribe()
    }

    /// Recording progress.
    pub fn on_recording_progress(&self) -> broadcast::Receiver<RecordingProgress> {
        self.recorder.on_progress()
    }

    /// Playback status.
    pub fn on_playback_status(&self) -> broadcast::Receiver<PlaybackStatus> {
        self.player.on_status()
    }

    /// Non-fatal routing fallbacks.
    pub fn on_warning(&self) -> broadcast::Receiver<RouteWarning> {
        self.sessions.on_warning()
    }

    /// Stop everything, resolving in-flight operations, and release the session.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        if let Some(Err(failure)) = self.recorder.shutdown().await {
            warn!(%failure, "Recording ended with an error during shutdown");
        }
        if let Some(Err(failure)) = self.player.stop().await {
            warn!(%failure, "Playback ended with an error during shutdown");
        }
        if let Err(e) = self.sessions.teardown().await {
            warn!(error = %e, "Session teardown failed during shutdown");
        }
        self.coordinator.stop();
        self.monitor.stop();
        info!("Event bridge shut down");
    }
}
