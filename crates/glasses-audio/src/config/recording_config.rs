use crate::config::{default_duration_seconds, default_output_dir};

use std::path::PathBuf;

use glasses_audio_core::SourcePreference;
use serde::{Deserialize, Serialize};

/// Recording defaults applied when the command line leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Directory that receives `recording-<uuid>.wav` files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Hardware preference.
    #[serde(default)]
    pub default_source: SourcePreference,
    /// Automatic stop limit in seconds (0 = until Ctrl-C).
    #[serde(default = "default_duration_seconds")]
    pub default_duration_seconds: f64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            default_source: SourcePreference::default(),
            default_duration_seconds: default_duration_seconds(),
        }
    }
}
