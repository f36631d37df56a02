use crate::{
    audio::{FormatConverter, downmix, remix},
    platform::StreamFormat,
};

// Test constants
const CAPTURE_BUFFER_FRAMES: usize = 480;
const CAPTURE_BUFFERS: usize = 10;
const TARGET_RATE: u32 = 16_000;

/// WHAT: Stereo frames average into mono
/// WHY: Recordings are mono regardless of the microphone layout
#[test]
fn given_stereo_frames_when_downmixing_then_channels_averaged() {
    // Given: Two stereo frames
    let stereo = [0.2, 0.4, -1.0, 1.0];

    // When: Downmixing
    let mono = downmix(&stereo, 2);

    // Then: One averaged sample per frame
    assert_eq!(mono.len(), 2);
    assert!((mono[0] - 0.3).abs() < 1e-6);
    assert_eq!(mono[1], 0.0);
}

/// WHAT: Mono fans out to every output channel
/// WHY: Mono speech clips play on stereo hardware
#[test]
fn given_mono_samples_when_remixing_to_stereo_then_duplicated() {
    // Given: Mono samples
    let mono = [0.1, 0.2];

    // When: Remixing to two channels
    let stereo = remix(&mono, 1, 2);

    // Then: Each sample appears on both channels
    assert_eq!(stereo, vec![0.1, 0.1, 0.2, 0.2]);
}

/// WHAT: Native 48kHz stereo capture converts to the exact 16kHz mono length
/// WHY: File duration must match the time audio was captured
#[test]
fn given_48khz_stereo_buffers_when_converting_then_16khz_mono_output() {
    // Given: A converter for a 48kHz stereo microphone
    let input = StreamFormat {
        sample_rate: 48_000,
        channels: 2,
    };
    let mut converter = FormatConverter::new(input, TARGET_RATE).unwrap();
    let buffer = vec![0.25f32; CAPTURE_BUFFER_FRAMES * 2];

    // When: Converting ten 10ms buffers and draining
    let mut samples = Vec::new();
    for _ in 0..CAPTURE_BUFFERS {
        samples.extend(converter.convert(&buffer).unwrap());
    }
    samples.extend(converter.finish().unwrap());

    // Then: 100ms of 16kHz mono
    assert_eq!(samples.len(), CAPTURE_BUFFER_FRAMES * CAPTURE_BUFFERS / 3);
    assert_eq!(converter.target_rate(), TARGET_RATE);
}

/// WHAT: Matching rates skip resampling and only quantise
/// WHY: SCO microphones already deliver 16kHz mono
#[test]
fn given_16khz_mono_input_when_converting_then_samples_quantised_in_place() {
    // Given: A converter whose input already matches the target
    let input = StreamFormat {
        sample_rate: TARGET_RATE,
        channels: 1,
    };
    let mut converter = FormatConverter::new(input, TARGET_RATE).unwrap();

    // When: Converting
    let samples = converter.convert(&[0.5, -1.0, 0.0]).unwrap();
    let tail = converter.finish().unwrap();

    // Then: Straight quantisation, nothing held back
    assert_eq!(samples, vec![16_384, -32_767, 0]);
    assert!(tail.is_empty());
}
