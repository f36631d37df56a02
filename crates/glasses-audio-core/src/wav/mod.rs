//! WAV file handling on top of `hound`.
//!
//! `format` maps the engine's PCM layout onto hound's `WavSpec`. `reader`
//! decodes whole in-memory files to normalised `f32`, and `writer` streams
//! 16-bit PCM to disk with the header patched on every sync.

mod format;
mod reader;
mod writer;

pub use {
    format::{CANONICAL_HEADER_LEN, SampleEncoding, WavError, WavFormat, f32_to_i16},
    reader::{DecodedWav, WavInfo, decode_wav, inspect},
    writer::{WavFileWriter, WavSummary},
};
