use crate::{
    CoreResult,
    audio::Resampler,
    platform::StreamFormat,
    wav::f32_to_i16,
};

use tracing::debug;

/// Converts native capture buffers to mono 16-bit PCM at the target rate.
///
/// Every buffer goes through downmix → streaming resample → quantise, so the
/// output is a continuous stream regardless of how the hardware chunks it.
pub struct FormatConverter {
    input: StreamFormat,
    target_rate: u32,
    resampler: Option<Resampler>,
}

impl FormatConverter {
    #[track_caller]
    pub fn new(input: StreamFormat, target_rate: u32) -> CoreResult<Self> {
        // Create resampler if needed
        let resampler = if input.sample_rate != target_rate {
            debug!(
                input_rate = input.sample_rate,
                output_rate = target_rate,
                channels = input.channels,
                "Resampler configured"
            );
            Some(Resampler::new(input.sample_rate, target_rate, 1)?)
        } else {
            None
        };

        Ok(Self {
            input,
            target_rate,
            resampler,
        })
    }

    /// Convert one interleaved capture buffer.
    #[track_caller]
    pub fn convert(&mut self, interleaved: &[f32]) -> CoreResult<Vec<i16>> {
        let mono = downmix(interleaved, usize::from(self.input.channels));
        let converted = match self.resampler.as_mut() {
            Some(resampler) => resampler.process(&mono)?,
            None => mono,
        };
        Ok(converted.into_iter().map(f32_to_i16).collect())
    }

    /// Drain whatever the resampler is still holding.
    #[track_caller]
    pub fn finish(&mut self) -> CoreResult<Vec<i16>> {
        let tail = match self.resampler.as_mut() {
            Some(resampler) => resampler.finish()?,
            None => Vec::new(),
        };
        Ok(tail.into_iter().map(f32_to_i16).collect())
    }

    /// Output sample rate.
    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }
}

/// Average interleaved channels into mono.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Map interleaved frames from one channel count to another.
///
/// Mono fans out to every channel, anything to mono is averaged, and other
/// combinations reuse source channels cyclically.
pub fn remix(interleaved: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return interleaved.to_vec();
    }
    if to == 1 {
        return downmix(interleaved, from);
    }

    let mut output = Vec::with_capacity(interleaved.len() / from * to);
    for frame in interleaved.chunks_exact(from) {
        for channel in 0..to {
            output.push(frame[channel % from]);
        }
    }
    output
}
