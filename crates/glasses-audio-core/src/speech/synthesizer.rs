use crate::CoreResult;

use std::path::PathBuf;

use async_trait::async_trait;

/// Text-to-speech collaborator.
///
/// Produces a WAV file the [`Player`](crate::Player) can read; the format is
/// taken from the file's header.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesise `text` and return the location of the audio file.
    async fn synthesize(&self, text: &str) -> CoreResult<PathBuf>;
}
