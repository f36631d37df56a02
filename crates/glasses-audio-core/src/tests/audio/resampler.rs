use crate::audio::Resampler;

// Test constants
const INPUT_SAMPLE_RATE: u32 = 48000;
const OUTPUT_SAMPLE_RATE: u32 = 16000;
const ONE_SECOND_INPUT_SAMPLES: usize = INPUT_SAMPLE_RATE as usize;
const ONE_SECOND_OUTPUT_SAMPLES: usize = OUTPUT_SAMPLE_RATE as usize;
const TEST_SIGNAL_AMPLITUDE: f32 = 0.5;
const TONE_INPUT_SAMPLES: usize = 4800;
const TONE_FREQUENCY_FACTOR: f32 = 0.1;
const TONE_OUTPUT_SAMPLES: usize = 1600;
const MAX_AMPLITUDE: f32 = 1.5;
const UNEVEN_BUFFER_SIZES: [usize; 5] = [441, 17, 1024, 3000, 5];
const STEREO_INPUT_FRAMES: usize = 4410;
const STEREO_OUTPUT_FRAMES: usize = 1600;
const LATE_IMPULSE_INPUT_FRAME: usize = 47_400;
const LATE_IMPULSE_OUTPUT_FRAME: usize = 15_800;

fn peak_frame(samples: &[f32]) -> usize {
    samples
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(i, _)| i)
        .unwrap()
}

/// WHAT: Resampler converts 48kHz to 16kHz with the exact expected length
/// WHY: Recording duration is derived from the number of frames written
#[test]
fn given_48khz_audio_when_resampling_to_16khz_then_output_length_exact() {
    // Given: Resampler configured for 48kHz -> 16kHz
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, 1).unwrap();
    let input = vec![TEST_SIGNAL_AMPLITUDE; ONE_SECOND_INPUT_SAMPLES];

    // When: Resampling audio data
    let output = resampler.resample(&input).unwrap();

    // Then: Output is exactly 1 second at 16kHz
    assert_eq!(output.len(), ONE_SECOND_OUTPUT_SAMPLES);
    assert!(output.iter().all(|&s| s.is_finite())); // No NaN/Inf
}

/// WHAT: Empty samples return empty output
/// WHY: Edge case handling for zero-length input
#[test]
fn given_empty_samples_when_resampling_then_empty_output() {
    // Given: Resampler and empty input
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, 1).unwrap();
    let empty: Vec<f32> = vec![];

    // When: Resampling empty data
    let output = resampler.resample(&empty).unwrap();

    // Then: Output is also empty
    assert!(output.is_empty());
}

/// WHAT: Resampling preserves signal characteristics
/// WHY: Validates that audio quality is maintained through resampling
#[test]
fn given_tone_signal_when_resampling_then_output_preserves_characteristics() {
    // Given: Resampler and a simple tone signal
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, 1).unwrap();
    let input: Vec<f32> = (0..TONE_INPUT_SAMPLES)
        .map(|i| (i as f32 * TONE_FREQUENCY_FACTOR).sin())
        .collect();

    // When: Resampling the signal
    let output = resampler.resample(&input).unwrap();

    // Then: Output has expected length and all samples are finite
    assert_eq!(output.len(), TONE_OUTPUT_SAMPLES);
    assert!(
        output
            .iter()
            .all(|&s| s.is_finite() && s.abs() <= MAX_AMPLITUDE)
    );
}

/// WHAT: Streaming in uneven buffers yields the same total as one-shot
/// WHY: Capture callbacks deliver arbitrary buffer sizes
#[test]
fn given_uneven_capture_buffers_when_streaming_then_total_length_exact() {
    // Given: A streaming resampler and buffers of awkward sizes
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, 1).unwrap();
    let total_in: usize = UNEVEN_BUFFER_SIZES.iter().sum();

    // When: Feeding each buffer then finishing
    let mut produced = 0;
    for size in UNEVEN_BUFFER_SIZES {
        produced += resampler.process(&vec![TEST_SIGNAL_AMPLITUDE; size]).unwrap().len();
    }
    produced += resampler.finish().unwrap().len();

    // Then: Output matches the rate ratio exactly
    let expected =
        (total_in as f64 * f64::from(OUTPUT_SAMPLE_RATE) / f64::from(INPUT_SAMPLE_RATE)).round();
    assert_eq!(produced, expected as usize);
}

/// WHAT: Multi-channel input keeps its interleaving
/// WHY: The player resamples stereo files for stereo output
#[test]
fn given_stereo_input_when_resampling_then_whole_interleaved_frames_returned() {
    // Given: 44.1kHz stereo resampled to 16kHz
    let mut resampler = Resampler::new(44_100, OUTPUT_SAMPLE_RATE, 2).unwrap();
    let input = vec![TEST_SIGNAL_AMPLITUDE; STEREO_INPUT_FRAMES * 2];

    // When: Resampling
    let output = resampler.resample(&input).unwrap();

    // Then: Exact frame count, two samples per frame
    assert_eq!(output.len(), STEREO_OUTPUT_FRAMES * 2);
}

/// WHAT: The filter delay is removed, so an impulse keeps its position
/// WHY: Captured audio must not start late or lose its final frames
#[test]
fn given_impulses_at_start_and_end_when_resampling_then_positions_preserved() {
    // Given: One second at 48kHz with an impulse on the first frame, and
    // another with an impulse near the end
    let mut head = vec![0.0f32; ONE_SECOND_INPUT_SAMPLES];
    head[0] = 1.0;
    let mut tail = vec![0.0f32; ONE_SECOND_INPUT_SAMPLES];
    tail[LATE_IMPULSE_INPUT_FRAME] = 1.0;

    // When: Resampling each to 16kHz
    let head_out = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, 1)
        .unwrap()
        .resample(&head)
        .unwrap();
    let tail_out = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, 1)
        .unwrap()
        .resample(&tail)
        .unwrap();

    // Then: Peaks land on the matching output frames and the length is exact
    assert!(peak_frame(&head_out) <= 1, "head peak at {}", peak_frame(&head_out));
    assert!(
        peak_frame(&tail_out).abs_diff(LATE_IMPULSE_OUTPUT_FRAME) <= 1,
        "tail peak at {}",
        peak_frame(&tail_out)
    );
    assert_eq!(head_out.len(), ONE_SECOND_OUTPUT_SAMPLES);
    assert_eq!(tail_out.len(), ONE_SECOND_OUTPUT_SAMPLES);
}
