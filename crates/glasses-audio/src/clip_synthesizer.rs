use std::{
    io,
    panic::Location,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use glasses_audio_core::{AudioError, CoreResult, SpeechSynthesizer};
use tracing::{debug, instrument};

/// Speech synthesizer backed by a directory of pre-rendered clips.
///
/// `"Battery low!"` resolves to `<clips_dir>/battery-low.wav`.
#[derive(Debug, Clone)]
pub struct ClipSynthesizer {
    clips_dir: PathBuf,
}

impl ClipSynthesizer {
    /// Look clips up in `clips_dir`.
    pub fn new(clips_dir: impl Into<PathBuf>) -> Self {
        Self {
            clips_dir: clips_dir.into(),
        }
    }

    /// Where the clip for `text` is expected.
    pub fn clip_path(&self, text: &str) -> PathBuf {
        self.clips_dir.join(format!("{}.wav", slug(text)))
    }
}

#[async_trait]
impl SpeechSynthesizer for ClipSynthesizer {
    #[instrument(skip(self))]
    async fn synthesize(&self, text: &str) -> CoreResult<PathBuf> {
        let path = self.clip_path(text);
        if is_clip(&path) {
            debug!(path = ?path, "Resolved speech clip");
            return Ok(path);
        }

        Err(AudioError::FileIoFailed {
            source: io::Error::new(io::ErrorKind::NotFound, "no pre-rendered clip for text"),
            path,
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

fn is_clip(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

/// Lowercase alphanumeric words joined by `-`.
pub(crate) fn slug(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
