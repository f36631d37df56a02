use crate::{
    ErrorCode, RecordingRequest, RecordingState, SourcePreference,
    tests::support::{Engine, eventually},
};

use std::time::{Duration, Instant};

// Test constants
const NATIVE_RATE: f64 = 48_000.0;
const ACTIVE_SPAN: Duration = Duration::from_millis(200);
const GAP: Duration = Duration::from_millis(300);
const SETTLE: Duration = Duration::from_millis(30);
const START_TIMEOUT: Duration = Duration::from_secs(2);

fn request(engine: &Engine, name: &str) -> RecordingRequest {
    RecordingRequest {
        output_path: engine.path(name),
        duration_limit: None,
        source: SourcePreference::Phone,
    }
}

/// WHAT: Nothing is captured during an interruption and capture continues after it
/// WHY: The file must be one continuous stream without the interrupted span
#[tokio::test]
async fn given_interruption_with_resume_when_recording_then_gap_excluded_from_file() {
    // Given: A live recording
    let engine = Engine::new();
    let wall = Instant::now();
    let _completion = engine.recorder.start_recording(request(&engine, "gap.wav")).unwrap();
    assert!(eventually(START_TIMEOUT, || engine.recorder.state() == RecordingState::Recording).await);
    tokio::time::sleep(ACTIVE_SPAN).await;

    // When: An interruption holds the device for a while
    engine.coordinator.begin_interruption().await;
    assert!(engine.coordinator.snapshot().should_resume_after_interruption);
    tokio::time::sleep(SETTLE).await;
    let before_gap = engine.platform.captured_frames();
    tokio::time::sleep(GAP).await;
    let after_gap = engine.platform.captured_frames();
    engine.coordinator.end_interruption(true).await;
    tokio::time::sleep(ACTIVE_SPAN).await;
    let outcome = engine.recorder.stop_recording().await.unwrap().unwrap();

    // Then: No frames during the gap, flags cleared, file covers only captured audio
    assert_eq!(before_gap, after_gap);
    assert!(!engine.coordinator.snapshot().is_interrupted);
    assert!(!engine.coordinator.snapshot().should_resume_after_interruption);
    let captured_seconds = engine.platform.captured_frames() as f64 / NATIVE_RATE;
    assert!(
        (outcome.duration_seconds - captured_seconds).abs() < 0.02,
        "file {} s vs captured {} s",
        outcome.duration_seconds,
        captured_seconds
    );
    assert!(outcome.duration_seconds < wall.elapsed().as_secs_f64() - GAP.as_secs_f64() + 0.05);
    assert!(outcome.duration_seconds > 0.3);
}

/// WHAT: An interruption ending without resume finalises the file and reports it
/// WHY: The OS forbade resuming, so the session must end cleanly
#[tokio::test]
async fn given_interruption_without_resume_when_recording_then_interrupted_and_not_resumed() {
    // Given: A live recording paused by an interruption
    let engine = Engine::new();
    let mut completion = engine.recorder.start_recording(request(&engine, "cut.wav")).unwrap();
    assert!(eventually(START_TIMEOUT, || engine.recorder.state() == RecordingState::Recording).await);
    tokio::time::sleep(ACTIVE_SPAN).await;
    engine.coordinator.begin_interruption().await;

    // When: The interruption ends without permission to resume
    engine.coordinator.end_interruption(false).await;

    // Then: INTERRUPTED_AND_NOT_RESUMED, yet the file on disk is valid
    let result = tokio::time::timeout(START_TIMEOUT, completion.wait())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.unwrap_err().code, ErrorCode::InterruptedAndNotResumed);
    let reader = hound::WavReader::open(engine.path("cut.wav")).unwrap();
    assert!(reader.len() > 0);
    assert!(!engine.platform.is_session_active());
    assert!(!engine.coordinator.snapshot().should_resume_after_interruption);
}

/// WHAT: A recording started during an interruption waits for it to end
/// WHY: Starting capture while the OS owns the device would fail or steal it
#[tokio::test]
async fn given_active_interruption_when_starting_recording_then_capture_deferred() {
    // Given: An interruption in progress
    let engine = Engine::new();
    engine.coordinator.begin_interruption().await;

    // When: Starting a recording
    let _completion = engine.recorder.start_recording(request(&engine, "later.wav")).unwrap();
    tokio::time::sleep(ACTIVE_SPAN).await;

    // Then: Nothing captured until the interruption ends
    assert_eq!(engine.recorder.state(), RecordingState::Connecting);
    assert_eq!(engine.platform.captured_frames(), 0);

    engine.coordinator.end_interruption(true).await;
    assert!(eventually(START_TIMEOUT, || engine.recorder.state() == RecordingState::Recording).await);
    assert!(eventually(START_TIMEOUT, || engine.platform.captured_frames() > 0).await);
    engine.recorder.stop_recording().await.unwrap().unwrap();
}
