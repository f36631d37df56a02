use crate::{AppResult, ClipSynthesizer, Command, config::Config};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use glasses_audio_core::{
    AppLifecycle, AudioPlatform, AudioRoute, EventBridge, OperationFailure,
    PlaybackOutcome, RecordingOutcome, RecordingRequest, SourcePreference, SpeechDisposition,
};
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Runs one command against an [`EventBridge`].
pub struct App {
    pub(crate) bridge: Arc<EventBridge>,
    pub(crate) config: Config,
}

impl App {
    /// Wire the engine over `platform` with the loaded configuration.
    pub fn new(platform: Arc<dyn AudioPlatform>, config: Config) -> Self {
        let synthesizer = Arc::new(ClipSynthesizer::new(config.speech.clips_dir.clone()));
        let bridge = Arc::new(EventBridge::new(
            platform,
            synthesizer,
            config.engine.clone(),
            config.recording.output_dir.clone(),
        ));
        Self { bridge, config }
    }

    /// Start the engine, run `command`, then shut the engine down.
    #[instrument(skip(self))]
    pub async fn run(&self, command: Command) -> AppResult<()> {
        // Subscribed before start so the initial route is not missed.
        let routes = self.bridge.on_route_change();
        self.bridge.start();

        let result = self.execute(command, routes).await;

        self.bridge.shutdown().await;
        result
    }

    async fn execute(&self, command: Command, routes: Receiver<AudioRoute>) -> AppResult<()> {
        match command {
            Command::Route => {
                let route = self.first_route(routes).await;
                println!("{:#?}", route);
            }
            Command::Watch => self.watch(routes).await,
            Command::Record {
                seconds,
                source,
                out,
            } => {
                let outcome = self.record(seconds, source, out).await?;
                println!(
                    "{{uri: {}, duration: {:.3}, size: {}}}",
                    outcome.output_path.display(),
                    outcome.duration_seconds,
                    outcome.byte_size
                );
            }
            Command::Play { path, source } => {
                let outcome = self.play(&path, source.unwrap_or_default()).await?;
                println!("{:?}", outcome);
            }
            Command::Speak { text, deferred } => {
                let disposition = self.speak(&text, deferred).await?;
                println!("{:?}", disposition);
            }
        }
        Ok(())
    }

    /// Initial route from the monitor, or the cached one if it is slow.
    async fn first_route(&self, mut routes: Receiver<AudioRoute>) -> AudioRoute {
        let wait = self.config.engine.route_poll_interval();
        match tokio::time::timeout(wait, routes.recv()).await {
            Ok(Ok(route)) => route,
            _ => self.bridge.get_route(),
        }
    }

    #[instrument(skip(self, routes))]
    async fn watch(&self, mut routes: Receiver<AudioRoute>) {
        let mut warnings = self.bridge.on_warning();
        info!("Watching route changes, Ctrl-C to exit");

        loop {
            tokio::select! {
                route = routes.recv() => match route {
                    Ok(route) => println!("{:#?}", route),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Route events lagged"),
                    Err(RecvError::Closed) => break,
                },
                warning = warnings.recv() => match warning {
                    Ok(warning) => println!("warning: {} ({})", warning.message, warning.code),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Warnings lagged"),
                    Err(RecvError::Closed) => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received, stopping watch");
                    break;
                }
            }
        }
    }

    /// Record until the duration limit or Ctrl-C.
    #[instrument(skip(self))]
    pub(crate) async fn record(
        &self,
        seconds: Option<f64>,
        source: Option<SourcePreference>,
        out: Option<PathBuf>,
    ) -> AppResult<RecordingOutcome> {
        let recording = &self.config.recording;
        let request = RecordingRequest {
            output_path: out.unwrap_or_else(|| {
                recording
                    .output_dir
                    .join(format!("recording-{}.wav", Uuid::new_v4()))
            }),
            duration_limit: RecordingRequest::limit_from_seconds(
                seconds.unwrap_or(recording.default_duration_seconds),
            ),
            source: source.unwrap_or(recording.default_source),
        };
        info!(
            path = ?request.output_path,
            source = %request.source,
            limit = ?request.duration_limit,
            "Recording"
        );

        let mut progress = self.bridge.on_recording_progress();
        let reporter = tokio::spawn(async move {
            while let Ok(event) = progress.recv().await {
                debug!(
                    duration = event.duration,
                    level = event.level,
                    is_recording = event.is_recording,
                    "Recording progress"
                );
            }
        });

        let mut completion = self.bridge.start_recording_to(request)?;
        let result = tokio::select! {
            result = completion.outcome() => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping recording");
                self.bridge
                    .stop_recording()
                    .await
                    .and_then(|outcome| outcome.ok_or_else(OperationFailure::no_result))
            }
        };
        reporter.abort();

        Ok(result?)
    }

    /// Play until the end of the file or Ctrl-C.
    #[instrument(skip(self))]
    pub(crate) async fn play(
        &self,
        path: &Path,
        source: SourcePreference,
    ) -> AppResult<PlaybackOutcome> {
        let mut status = self.bridge.on_playback_status();
        let reporter = tokio::spawn(async move {
            while let Ok(event) = status.recv().await {
                debug!(
                    state = ?event.state,
                    progress = event.progress,
                    "Playback status"
                );
            }
        });

        let mut completion = self.bridge.start_playback(path, source).await?;
        let result = tokio::select! {
            result = completion.outcome() => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping playback");
                self.bridge
                    .stop_playback()
                    .await
                    .and_then(|outcome| outcome.ok_or_else(OperationFailure::no_result))
            }
        };
        reporter.abort();

        Ok(result?)
    }

    /// Speak `text`; `deferred` queues it in the background first and then
    /// flushes the queue on the foreground transition.
    #[instrument(skip(self))]
    pub(crate) async fn speak(&self, text: &str, deferred: bool) -> AppResult<SpeechDisposition> {
        if !deferred {
            return Ok(self.bridge.speak(text).await?);
        }

        let _ = self.bridge.set_app_lifecycle(AppLifecycle::Background);
        let disposition = self.bridge.speak(text).await?;

        if let Some(flush) = self.bridge.set_app_lifecycle(AppLifecycle::Foreground) {
            match flush.await {
                Ok(report) => {
                    for failure in &report.failures {
                        warn!(text = %failure.text, failure = %failure.failure, "Queued speech failed");
                    }
                    info!(
                        spoken = report.spoken,
                        failed = report.failures.len(),
                        "Speech queue flushed"
                    );
                }
                Err(e) => warn!(error = %e, "Speech flush task failed"),
            }
        }

        Ok(disposition)
    }
}

