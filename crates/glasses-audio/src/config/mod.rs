mod logging_config;
#[allow(clippy::module_inception)]
mod config;
mod recording_config;
mod speech_config;

pub(crate) use {
    config::Config, logging_config::LoggingConfig, recording_config::RecordingConfig,
    speech_config::SpeechConfig,
};

use std::path::PathBuf;

use directories::ProjectDirs;

pub(crate) const DEFAULT_LOG_FILTER: &str = "glasses_audio=info,glasses_audio_core=info";
pub(crate) const DEFAULT_DURATION_SECONDS: f64 = 5.0;

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "glasses-audio", "Glasses-Audio")
}

/// Falls back to a relative directory when the platform has no home.
fn data_subdir(name: &str) -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

pub(crate) fn default_output_dir() -> PathBuf {
    data_subdir("recordings")
}

pub(crate) fn default_clips_dir() -> PathBuf {
    data_subdir("clips")
}

pub(crate) fn default_duration_seconds() -> f64 {
    DEFAULT_DURATION_SECONDS
}

pub(crate) fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
