//! Glasses Audio Core Library
//!
//! Audio routing, capture and playback engine for a phone paired with
//! Bluetooth smart glasses. Detects hardware routes, negotiates the SCO voice
//! link, records normalised 16 kHz mono WAV files, plays arbitrary WAV files,
//! and arbitrates the shared audio device across OS interruptions and app
//! lifecycle changes.
//!
//! # Example
//!
//! ```no_run
//! use glasses_audio_core::{
//!     CoreResult, CpalPlatform, EngineConfig, EventBridge, SourcePreference, SpeechSynthesizer,
//! };
//!
//! use std::{path::PathBuf, sync::Arc};
//!
//! struct Silent;
//!
//! #[async_trait::async_trait]
//! impl SpeechSynthesizer for Silent {
//!     async fn synthesize(&self, _text: &str) -> CoreResult<PathBuf> {
//!         Ok(PathBuf::from("silence.wav"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let bridge = EventBridge::new(
//!         Arc::new(CpalPlatform::new()),
//!         Arc::new(Silent),
//!         EngineConfig::default(),
//!         "recordings",
//!     );
//!     bridge.start();
//!
//!     match bridge.start_recording(Some(3.0), Some(SourcePreference::Glasses)).await {
//!         Ok(outcome) => println!("Recorded {:?}", outcome.output_path),
//!         Err(failure) => eprintln!("Recording failed: {}", failure),
//!     }
//!
//!     bridge.shutdown().await;
//! }
//! ```

mod audio;
mod bridge;
mod completion;
mod engine_config;
mod error;
mod interruption;
mod model;
mod platform;
mod player;
mod recorder;
mod route_monitor;
mod session;
mod speech;
pub mod wav;

pub use {
    bridge::EventBridge,
    completion::Completion,
    engine_config::EngineConfig,
    error::{AudioError, ErrorCode, OperationFailure, Result as CoreResult},
    interruption::{InterruptionCoordinator, InterruptionSnapshot, InterruptionState},
    model::{
        AppLifecycle, AudioDevice, AudioRoute, DeviceKind, PendingSpeechRequest, Permission,
        PlaybackCompletion, PlaybackOutcome, PlaybackSession, PlaybackState, PlaybackStatus,
        RecordingCompletion, RecordingOutcome, RecordingProgress, RecordingRequest,
        RecordingSession, RecordingState, RouteWarning, SourcePreference, SpeechDisposition,
        SpeechFailure,
    },
    platform::{
        AudioPlatform, AudioStream, CaptureSink, CpalPlatform, PlatformError, PlatformEvent,
        PlatformResult, RenderSource, RouteSnapshot, SessionCategory, SessionConfig, SessionMode,
        SimulatedDevices, SimulatedPlatform, StreamErrorSink, StreamFormat,
    },
    player::Player,
    recorder::Recorder,
    route_monitor::RouteMonitor,
    session::{AudioSessionController, SessionLease, SessionPurpose},
    speech::{DeferredSpeechQueue, FlushReport, SpeechSynthesizer},
};
