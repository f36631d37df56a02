use hound::{SampleFormat, WavSpec};
use thiserror::Error;

/// Header length hound writes for mono or stereo PCM up to 16 bits.
pub const CANONICAL_HEADER_LEN: usize = 44;

/// Errors raised while decoding WAV bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WavError {
    /// The RIFF structure could not be read.
    #[error("Malformed WAV data: {0}")]
    Malformed(String),

    /// Readable, but an encoding the engine does not decode.
    #[error("Unsupported WAV format: {0}")]
    Unsupported(String),
}

impl From<hound::Error> for WavError {
    fn from(e: hound::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Numeric encoding of the samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Integer PCM.
    Int,
    /// IEEE 754 floating point.
    Float,
}

/// PCM layout described by a `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// Frames per second.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Integer or float samples.
    pub encoding: SampleEncoding,
}

impl WavFormat {
    /// 16 kHz mono 16-bit signed little-endian PCM, the recorder's output format.
    pub const CANONICAL: WavFormat = WavFormat {
        sample_rate: 16_000,
        channels: 1,
        bits_per_sample: 16,
        encoding: SampleEncoding::Int,
    };

    /// Mono 16-bit PCM at `sample_rate`.
    pub fn pcm16_mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::CANONICAL
        }
    }

    /// Bytes per interleaved frame.
    pub fn block_align(&self) -> usize {
        usize::from(self.bits_per_sample).div_ceil(8) * usize::from(self.channels)
    }
}

impl From<WavSpec> for WavFormat {
    fn from(spec: WavSpec) -> Self {
        Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            encoding: match spec.sample_format {
                SampleFormat::Int => SampleEncoding::Int,
                SampleFormat::Float => SampleEncoding::Float,
            },
        }
    }
}

impl From<WavFormat> for WavSpec {
    fn from(format: WavFormat) -> Self {
        Self {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample,
            sample_format: match format.encoding {
                SampleEncoding::Int => SampleFormat::Int,
                SampleEncoding::Float => SampleFormat::Float,
            },
        }
    }
}

/// Quantise a normalised sample to 16-bit PCM.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}
