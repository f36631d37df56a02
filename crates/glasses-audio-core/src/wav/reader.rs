use crate::wav::{SampleEncoding, WavError, WavFormat};

use std::io::Cursor;

use hound::WavReader;

/// Format and length of a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    /// Format declared by the header.
    pub format: WavFormat,
    /// Complete frames in the data chunk.
    pub frames: u32,
}

impl WavInfo {
    /// Audio length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        match self.format.sample_rate {
            0 => 0.0,
            rate => f64::from(self.frames) / f64::from(rate),
        }
    }
}

/// A whole WAV file decoded to interleaved `f32` in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWav {
    /// Format declared by the header.
    pub format: WavFormat,
    /// Interleaved samples.
    pub samples: Vec<f32>,
}

impl DecodedWav {
    /// Complete frames decoded.
    pub fn frames(&self) -> usize {
        match usize::from(self.format.channels) {
            0 => 0,
            channels => self.samples.len() / channels,
        }
    }
}

/// Read the header of an in-memory WAV file.
pub fn inspect(bytes: &[u8]) -> Result<WavInfo, WavError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    Ok(WavInfo {
        format: reader.spec().into(),
        frames: reader.duration(),
    })
}

/// Decode an in-memory WAV file. Nothing about the format is assumed; the
/// header is authoritative.
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedWav, WavError> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let format = WavFormat::from(reader.spec());

    let samples = match (format.encoding, format.bits_per_sample) {
        (SampleEncoding::Float, 32) => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        (SampleEncoding::Int, bits @ 8..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
        (encoding, bits) => {
            return Err(WavError::Unsupported(format!(
                "{encoding:?} samples with {bits} bits"
            )));
        }
    };

    Ok(DecodedWav { format, samples })
}
