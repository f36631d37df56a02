use crate::wav::{SampleEncoding, WavFormat, f32_to_i16};

/// WHAT: Quantisation rounds and clamps out-of-range samples
/// WHY: Resampler overshoot must not wrap around into loud clicks
#[test]
fn given_out_of_range_samples_when_quantising_then_clamped_to_i16_limits() {
    // Given/When/Then: Over-range clamps, mid-range rounds
    assert_eq!(f32_to_i16(1.5), i16::MAX);
    assert_eq!(f32_to_i16(-1.5), i16::MIN);
    assert_eq!(f32_to_i16(0.0), 0);
    assert_eq!(f32_to_i16(0.5), 16_384);
}

/// WHAT: The engine format maps onto hound's spec and back unchanged
/// WHY: The writer and reader both go through hound
#[test]
fn given_float_stereo_format_when_converting_to_spec_then_fields_preserved() {
    // Given: 48 kHz stereo float
    let format = WavFormat {
        sample_rate: 48_000,
        channels: 2,
        bits_per_sample: 32,
        encoding: SampleEncoding::Float,
    };

    // When: Converting to a hound spec and back
    let spec = hound::WavSpec::from(format);
    let back = WavFormat::from(spec);

    // Then: Same layout, float sample format
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(back, format);
    assert_eq!(back.block_align(), 8);
}
