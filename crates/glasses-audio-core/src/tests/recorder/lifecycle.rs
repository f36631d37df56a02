use crate::{
    DeviceKind, ErrorCode, Permission, RecordingRequest, RecordingState, SourcePreference,
    tests::support::{Engine, eventually},
    wav::CANONICAL_HEADER_LEN,
};

use std::time::{Duration, Instant};

// Test constants
const RECORD_FOR: Duration = Duration::from_millis(300);
const LIMIT: Duration = Duration::from_millis(250);
const START_TIMEOUT: Duration = Duration::from_secs(2);

fn request(engine: &Engine, name: &str, source: SourcePreference) -> RecordingRequest {
    RecordingRequest {
        output_path: engine.path(name),
        duration_limit: None,
        source,
    }
}

/// WHAT: A stopped recording is a 16kHz mono 16-bit WAV whose size matches the outcome
/// WHY: Callers rely on byteSize and durationSeconds describing the file on disk
#[tokio::test]
async fn given_phone_recording_when_stopped_then_canonical_wav_matches_outcome() {
    // Given: A PHONE recording running for a while
    let engine = Engine::new();
    let mut completion = engine
        .recorder
        .start_recording(request(&engine, "take.wav", SourcePreference::Phone))
        .unwrap();
    assert!(eventually(START_TIMEOUT, || engine.recorder.state() == RecordingState::Recording).await);
    tokio::time::sleep(RECORD_FOR).await;

    // When: Stopping
    let outcome = engine.recorder.stop_recording().await.unwrap().unwrap();

    // Then: The file is canonical PCM and agrees with the outcome
    let mut reader = hound::WavReader::open(&outcome.output_path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(
        outcome.byte_size,
        (CANONICAL_HEADER_LEN + samples.len() * 2) as u64
    );
    assert_eq!(
        std::fs::metadata(&outcome.output_path).unwrap().len(),
        outcome.byte_size
    );
    assert!((outcome.duration_seconds - samples.len() as f64 / 16_000.0).abs() < 1e-9);
    assert!(outcome.duration_seconds > 0.2 && outcome.duration_seconds < 1.0);
    assert!(samples.iter().any(|&s| s != 0), "tone must reach the file");

    // Then: The original completion resolves to the same outcome
    assert_eq!(completion.wait().await.unwrap().unwrap(), outcome);
    assert_eq!(engine.recorder.state(), RecordingState::Completed);
    assert!(!engine.platform.is_session_active());
}

/// WHAT: Concurrent and repeated stops all observe one result
/// WHY: UI double-taps must not corrupt the file or fail the second caller
#[tokio::test]
async fn given_live_recording_when_stopped_twice_concurrently_then_same_outcome() {
    // Given: A live recording
    let engine = Engine::new();
    let _completion = engine
        .recorder
        .start_recording(request(&engine, "double.wav", SourcePreference::Auto))
        .unwrap();
    assert!(eventually(START_TIMEOUT, || engine.recorder.state() == RecordingState::Recording).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // When: Two stops race, then a third arrives late
    let (first, second) = tokio::join!(
        engine.recorder.stop_recording(),
        engine.recorder.stop_recording()
    );
    let third = engine.recorder.stop_recording().await;

    // Then: All three carry the same successful outcome
    let first = first.unwrap().unwrap();
    assert_eq!(second.unwrap().unwrap(), first);
    assert_eq!(third.unwrap().unwrap(), first);
}

/// WHAT: A second start while recording fails and leaves the first untouched
/// WHY: At most one recording session may be live
#[tokio::test]
async fn given_live_recording_when_starting_again_then_already_recording() {
    // Given: A live recording
    let engine = Engine::new();
    let _completion = engine
        .recorder
        .start_recording(request(&engine, "first.wav", SourcePreference::Auto))
        .unwrap();

    // When: Starting a second one
    let second = engine
        .recorder
        .start_recording(request(&engine, "second.wav", SourcePreference::Auto));

    // Then: Rejected, and the first still completes
    assert_eq!(second.unwrap_err().code(), ErrorCode::AlreadyRecording);
    assert!(!engine.path("second.wav").exists());
    let outcome = engine.recorder.stop_recording().await.unwrap().unwrap();
    assert_eq!(outcome.output_path, engine.path("first.wav"));
}

/// WHAT: The duration limit ends the recording on its own
/// WHY: Timed recordings must stop without a manual call
#[tokio::test]
async fn given_duration_limit_when_recording_then_completes_near_limit() {
    // Given: A recording limited to a quarter second
    let engine = Engine::new();
    let mut request = request(&engine, "limited.wav", SourcePreference::Phone);
    request.duration_limit = Some(LIMIT);

    // When: Waiting for the result
    let started = Instant::now();
    let mut completion = engine.recorder.start_recording(request).unwrap();
    let outcome = completion.wait().await.unwrap().unwrap();

    // Then: Audio length tracks the limit and a late stop sees the same result
    assert!(started.elapsed() >= LIMIT);
    assert!(
        (outcome.duration_seconds - LIMIT.as_secs_f64()).abs() < 0.1,
        "duration {}",
        outcome.duration_seconds
    );
    assert_eq!(engine.recorder.stop_recording().await.unwrap().unwrap(), outcome);
}

/// WHAT: PHONE records from the built-in microphone even with glasses attached
/// WHY: The explicit preference must never be overridden by Bluetooth
#[tokio::test]
async fn given_glasses_attached_when_recording_phone_then_built_in_microphone_used() {
    // Given: Glasses attached
    let engine = Engine::new();
    engine.platform.connect_glasses("Frames");

    // When: Recording with PHONE
    let _completion = engine
        .recorder
        .start_recording(request(&engine, "phone.wav", SourcePreference::Phone))
        .unwrap();
    assert!(eventually(START_TIMEOUT, || engine.recorder.state() == RecordingState::Recording).await);

    // Then: Built-in input routed, no SCO
    let route = engine.monitor.refresh();
    assert_eq!(route.inputs[0].kind, DeviceKind::BuiltInMic);
    assert!(!engine.platform.is_sco_on());
    engine.recorder.stop_recording().await.unwrap().unwrap();
}

/// WHAT: GLASSES records over SCO and still produces the canonical format
/// WHY: SCO microphones deliver 16kHz mono natively
#[tokio::test]
async fn given_glasses_when_recording_glasses_then_sco_capture_and_teardown() {
    // Given: Glasses attached
    let engine = Engine::new();
    engine.platform.connect_glasses("Frames");

    // When: Recording with GLASSES then stopping
    let _completion = engine
        .recorder
        .start_recording(request(&engine, "glasses.wav", SourcePreference::Glasses))
        .unwrap();
    assert!(eventually(START_TIMEOUT, || engine.recorder.state() == RecordingState::Recording).await);
    assert!(engine.platform.is_sco_on());
    tokio::time::sleep(Duration::from_millis(150)).await;
    let outcome = engine.recorder.stop_recording().await.unwrap().unwrap();

    // Then: Valid file, SCO and communication mode undone
    let reader = hound::WavReader::open(&outcome.output_path).unwrap();
    assert_eq!(reader.spec().sample_rate, 16_000);
    assert!(reader.len() > 0);
    assert!(!engine.platform.is_sco_on());
    assert!(!engine.platform.communication_mode());
}

/// WHAT: Progress events carry a live level while recording and a final stop event
/// WHY: UIs draw a level meter from these events
#[tokio::test]
async fn given_live_recording_when_subscribed_then_progress_reports_level() {
    // Given: A progress subscriber and a live recording
    let engine = Engine::new();
    let mut progress = engine.recorder.on_progress();
    let _completion = engine
        .recorder
        .start_recording(request(&engine, "level.wav", SourcePreference::Phone))
        .unwrap();

    // When: Waiting for a recording event with a level
    let live = tokio::time::timeout(START_TIMEOUT, async {
        loop {
            let event = progress.recv().await.unwrap();
            if event.is_recording && event.level > 0.05 {
                return event;
            }
        }
    })
    .await
    .unwrap();
    engine.recorder.stop_recording().await.unwrap().unwrap();

    // Then: The level reflects the tone, and the last event says stopped
    assert!(live.level < 1.0);
    let last = tokio::time::timeout(START_TIMEOUT, async {
        loop {
            let event = progress.recv().await.unwrap();
            if !event.is_recording {
                return event;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(last.session_id, live.session_id);
}

/// WHAT: Stopping during session setup still yields a valid empty file
/// WHY: A stop must never leave a half-written header behind
#[tokio::test]
async fn given_stop_during_connect_when_recording_glasses_then_empty_valid_wav() {
    // Given: Glasses whose SCO link takes its time
    let engine = Engine::new();
    engine.platform.connect_glasses("Frames");
    engine.platform.set_sco_latency(Some(Duration::from_millis(100)));
    let _completion = engine
        .recorder
        .start_recording(request(&engine, "early.wav", SourcePreference::Glasses))
        .unwrap();

    // When: Stopping right away
    let outcome = engine.recorder.stop_recording().await.unwrap().unwrap();

    // Then: A bare valid WAV and a released session
    assert_eq!(outcome.byte_size, CANONICAL_HEADER_LEN as u64);
    assert_eq!(outcome.duration_seconds, 0.0);
    assert!(hound::WavReader::open(&outcome.output_path).is_ok());
    assert!(!engine.platform.is_session_active());
    assert!(!engine.platform.is_sco_on());
}

/// WHAT: Missing microphone permission fails synchronously
/// WHY: Nothing should start when capture is impossible
#[tokio::test]
async fn given_microphone_denied_when_starting_then_permission_denied_without_file() {
    // Given: Microphone denied
    let engine = Engine::new();
    engine.platform.deny_permission(Permission::Microphone);

    // When: Starting
    let result = engine
        .recorder
        .start_recording(request(&engine, "denied.wav", SourcePreference::Phone));

    // Then: PERMISSION_DENIED, no file, no session
    assert_eq!(result.unwrap_err().code(), ErrorCode::PermissionDenied);
    assert!(!engine.path("denied.wav").exists());
    assert_eq!(engine.platform.session_activations(), 0);
    assert_eq!(engine.recorder.state(), RecordingState::Idle);
}

/// WHAT: An unwritable destination fails with FILE_IO_FAILED and releases the session
/// WHY: Resources must be released on every failure path
#[tokio::test]
async fn given_unwritable_path_when_recording_then_file_io_failed_and_session_released() {
    // Given: A destination under a regular file
    let engine = Engine::new();
    let blocker = engine.path("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let request = RecordingRequest {
        output_path: blocker.join("take.wav"),
        duration_limit: None,
        source: SourcePreference::Phone,
    };

    // When: Recording
    let mut completion = engine.recorder.start_recording(request).unwrap();
    let result = completion.wait().await.unwrap();

    // Then: FILE_IO_FAILED, session torn down, no stream left open
    assert_eq!(result.unwrap_err().code, ErrorCode::FileIoFailed);
    assert_eq!(engine.recorder.state(), RecordingState::Failed);
    assert!(!engine.platform.is_session_active());
    assert_eq!(engine.platform.open_streams(), 0);
}

/// WHAT: Stopping with no session returns nothing
/// WHY: Stop is safe to call at any time
#[tokio::test]
async fn given_no_recording_when_stopping_then_none() {
    // Given: A fresh recorder
    let engine = Engine::new();

    // When/Then: Nothing to stop
    assert!(engine.recorder.stop_recording().await.is_none());
}

/// WHAT: A lost capture device fails the recording with DEVICE_UNAVAILABLE
/// WHY: Stream errors end the session instead of hanging it
#[tokio::test]
async fn given_stream_error_when_recording_then_device_unavailable() {
    // Given: A live recording
    let engine = Engine::new();
    let mut completion = engine
        .recorder
        .start_recording(request(&engine, "lost.wav", SourcePreference::Phone))
        .unwrap();
    assert!(eventually(START_TIMEOUT, || engine.recorder.state() == RecordingState::Recording).await);

    // When: The device disappears
    engine.platform.inject_stream_error("microphone unplugged");

    // Then: DEVICE_UNAVAILABLE and everything released
    let result = tokio::time::timeout(START_TIMEOUT, completion.wait())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.unwrap_err().code, ErrorCode::DeviceUnavailable);
    assert!(!engine.platform.is_session_active());
}

/// WHAT: A limit beyond the clock's range records until stopped
/// WHY: An oversized limit must not leave the recorder stuck in Recording
#[tokio::test]
async fn given_limit_past_clock_range_when_recording_then_stop_releases_everything() {
    // Given: A recording whose limit cannot be added to the current instant
    let engine = Engine::new();
    let mut huge = request(&engine, "endless.wav", SourcePreference::Auto);
    huge.duration_limit = Some(Duration::from_secs(u64::MAX));
    let _completion = engine.recorder.start_recording(huge).unwrap();
    assert!(eventually(START_TIMEOUT, || engine.recorder.state() == RecordingState::Recording).await);

    // When: Stopping it
    let outcome = tokio::time::timeout(START_TIMEOUT, engine.recorder.stop_recording())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    // Then: File written, hardware released, the next start is accepted
    assert!(outcome.output_path.exists());
    assert!(!engine.platform.is_session_active());
    let next = engine
        .recorder
        .start_recording(request(&engine, "next.wav", SourcePreference::Auto));
    assert!(next.is_ok());
    let _ = engine.recorder.stop_recording().await;
}

/// WHAT: Seconds map to a limit only when positive and representable
/// WHY: Zero means "until stopped" and huge values must not panic
#[test]
fn given_seconds_when_converting_to_limit_then_only_usable_values_kept() {
    // Given/When/Then
    assert_eq!(
        RecordingRequest::limit_from_seconds(1.5),
        Some(Duration::from_millis(1_500))
    );
    assert_eq!(RecordingRequest::limit_from_seconds(0.0), None);
    assert_eq!(RecordingRequest::limit_from_seconds(-3.0), None);
    assert_eq!(RecordingRequest::limit_from_seconds(f64::NAN), None);
    assert_eq!(RecordingRequest::limit_from_seconds(f64::INFINITY), None);
    assert_eq!(RecordingRequest::limit_from_seconds(1e20), None);
}
