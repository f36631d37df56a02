mod audio_device;
mod audio_route;
mod lifecycle;
mod permission;
mod playback;
mod recording;
mod route_warning;
mod source_preference;
mod speech;

pub use {
    audio_device::{AudioDevice, DeviceKind},
    audio_route::AudioRoute,
    lifecycle::AppLifecycle,
    permission::Permission,
    playback::{PlaybackCompletion, PlaybackOutcome, PlaybackSession, PlaybackState, PlaybackStatus},
    recording::{
        RecordingCompletion, RecordingOutcome, RecordingProgress, RecordingRequest,
        RecordingSession, RecordingState,
    },
    route_warning::RouteWarning,
    source_preference::SourcePreference,
    speech::{PendingSpeechRequest, SpeechDisposition, SpeechFailure},
};
