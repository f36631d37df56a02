use crate::config::default_clips_dir;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where pre-rendered speech clips are looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Directory of `<slug>.wav` clips.
    #[serde(default = "default_clips_dir")]
    pub clips_dir: PathBuf,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            clips_dir: default_clips_dir(),
        }
    }
}
