use crate::wav::{SampleEncoding, WavError, WavFormat, decode_wav, inspect};

use std::io::Cursor;

// Test constants
const TOLERANCE: f32 = 1e-6;
const RATE: u32 = 16_000;

fn spec(bits: u16, sample_format: hound::SampleFormat) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: bits,
        sample_format,
    }
}

fn wav_bytes<S: hound::Sample + Copy>(spec: hound::WavSpec, samples: &[S]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// WHAT: Every integer width decodes to the normalised range
/// WHY: The player accepts 8, 16 and 24-bit files from other tools
#[test]
fn given_integer_pcm_widths_when_decoding_then_normalised_values() {
    // Given: 8-bit floor and midpoint, 16-bit minimum, 24-bit minus one
    let eight = wav_bytes(spec(8, hound::SampleFormat::Int), &[-128i8, 0]);
    let sixteen = wav_bytes(spec(16, hound::SampleFormat::Int), &[i16::MIN]);
    let twenty_four = wav_bytes(spec(24, hound::SampleFormat::Int), &[-1i32]);

    // When: Decoding each
    let eight = decode_wav(&eight).unwrap();
    let sixteen = decode_wav(&sixteen).unwrap();
    let twenty_four = decode_wav(&twenty_four).unwrap();

    // Then: Values land where expected
    assert_eq!(eight.samples, vec![-1.0, 0.0]);
    assert_eq!(sixteen.samples, vec![-1.0]);
    assert!((twenty_four.samples[0] + 1.0 / 8_388_608.0).abs() < TOLERANCE);
    assert_eq!(twenty_four.format.bits_per_sample, 24);
}

/// WHAT: Float samples decode unchanged
/// WHY: Desktop tools commonly export 32-bit float WAV
#[test]
fn given_float_wav_when_decoding_then_samples_unchanged() {
    // Given: Three float samples
    let bytes = wav_bytes(spec(32, hound::SampleFormat::Float), &[0.25f32, -0.5, 1.0]);

    // When: Decoding
    let audio = decode_wav(&bytes).unwrap();

    // Then: Float encoding, identical values
    assert_eq!(audio.format.encoding, SampleEncoding::Float);
    assert_eq!(audio.samples, vec![0.25, -0.5, 1.0]);
    assert_eq!(audio.frames(), 3);
}

/// WHAT: Inspecting reads the format and length without decoding
/// WHY: Callers check recorded files without loading every sample
#[test]
fn given_canonical_wav_when_inspecting_then_format_and_frames_reported() {
    // Given: 1600 frames of canonical PCM
    let bytes = wav_bytes(spec(16, hound::SampleFormat::Int), &[0i16; 1_600]);

    // When: Inspecting
    let info = inspect(&bytes).unwrap();

    // Then: Canonical format, 0.1 s
    assert_eq!(info.format, WavFormat::CANONICAL);
    assert_eq!(info.frames, 1_600);
    assert!((info.duration_seconds() - 0.1).abs() < 1e-9);
}

/// WHAT: Bytes that are not a WAV file are reported as malformed
/// WHY: The player maps this to DECODE_FAILED instead of playing noise
#[test]
fn given_non_riff_bytes_when_decoding_then_malformed() {
    // Given: Plain text
    let bytes = b"this is not a wave file at all".to_vec();

    // When: Decoding and inspecting
    let decoded = decode_wav(&bytes);
    let inspected = inspect(&bytes);

    // Then: Both rejected
    assert!(matches!(decoded, Err(WavError::Malformed(_))));
    assert!(matches!(inspected, Err(WavError::Malformed(_))));
}
