use crate::{
    AudioError, CoreResult,
    audio::{Resampler, remix},
    platform::StreamFormat,
    wav::{self, DecodedWav},
};

use std::{io, path::Path};

use tracing::debug;

/// Read and decode `path`.
pub(crate) async fn load_wav(path: &Path) -> CoreResult<DecodedWav> {
    let owned = path.to_path_buf();
    let bytes = tokio::task::spawn_blocking(move || std::fs::read(&owned))
        .await
        .map_err(|e| AudioError::file_io(path, io::Error::other(e.to_string())))?
        .map_err(|e| AudioError::file_io(path, e))?;
    decode_wav(&bytes)
}

/// Decode an in-memory WAV file, mapping every failure to `DECODE_FAILED`.
#[track_caller]
pub(crate) fn decode_wav(bytes: &[u8]) -> CoreResult<DecodedWav> {
    let audio = wav::decode_wav(bytes).map_err(|e| AudioError::decode_failed(e.to_string()))?;
    if audio.format.sample_rate == 0 || audio.format.channels == 0 {
        return Err(AudioError::decode_failed("header declares no samples per second or channels"));
    }

    debug!(
        sample_rate = audio.format.sample_rate,
        channels = audio.format.channels,
        bits = audio.format.bits_per_sample,
        frames = audio.frames(),
        "WAV decoded"
    );
    Ok(audio)
}

/// Remix and resample decoded audio to what the render stream accepts.
pub(crate) fn convert_for_render(audio: DecodedWav, target: StreamFormat) -> CoreResult<Vec<f32>> {
    let from = usize::from(audio.format.channels);
    let to = usize::from(target.channels);
    let remixed = if from == to {
        audio.samples
    } else {
        remix(&audio.samples, from, to)
    };

    if audio.format.sample_rate == target.sample_rate || remixed.is_empty() {
        return Ok(remixed);
    }

    let mut resampler = Resampler::new(audio.format.sample_rate, target.sample_rate, to)?;
    resampler.resample(&remixed)
}
