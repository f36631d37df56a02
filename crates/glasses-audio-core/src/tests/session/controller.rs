use crate::{
    DeviceKind, ErrorCode, Permission, SessionPurpose, SourcePreference,
    tests::support::Engine,
};

use std::time::Duration;

// Test constants
const GLASSES: &str = "Frames";

/// WHAT: GLASSES recording with glasses brings up SCO and routes capture to them
/// WHY: The voice path must be confirmed before capture begins
#[tokio::test]
async fn given_glasses_when_acquiring_glasses_recording_then_sco_route_granted() {
    // Given: Glasses attached
    let engine = Engine::new();
    engine.platform.connect_glasses(GLASSES);

    // When: Acquiring a recording lease
    let lease = engine
        .sessions
        .acquire(SourcePreference::Glasses, SessionPurpose::Recording)
        .await
        .unwrap();

    // Then: SCO is up and the lease captures from the glasses
    assert!(engine.platform.is_sco_on());
    assert!(engine.platform.communication_mode());
    assert!(lease.uses_bluetooth_input());
    assert_eq!(lease.input.as_ref().map(|d| d.kind), Some(DeviceKind::BluetoothHfp));
    assert!(lease.warning.is_none());

    // When: Releasing the lease
    engine.sessions.release(lease).await.unwrap();

    // Then: Every configuration step is reversed
    assert!(!engine.platform.is_session_active());
    assert!(!engine.platform.is_sco_on());
    assert!(!engine.platform.communication_mode());
}

/// WHAT: An SCO link that never confirms falls back to built-in with a warning
/// WHY: Some headsets never complete the voice handshake
#[tokio::test]
async fn given_sco_never_connects_when_acquiring_glasses_then_built_in_fallback_and_warning() {
    // Given: Glasses whose SCO link never comes up
    let engine = Engine::new();
    engine.platform.connect_glasses(GLASSES);
    engine.platform.set_sco_latency(None);
    let mut warnings = engine.sessions.on_warning();

    // When: Acquiring a GLASSES recording lease
    let lease = engine
        .sessions
        .acquire(SourcePreference::Glasses, SessionPurpose::Recording)
        .await
        .unwrap();

    // Then: Built-in capture, voice path undone, warning delivered
    assert_eq!(lease.input.as_ref().map(|d| d.kind), Some(DeviceKind::BuiltInMic));
    assert!(!engine.platform.communication_mode());
    let warning = lease.warning.clone().unwrap();
    assert_eq!(warning.code, ErrorCode::DeviceUnavailable);
    assert_eq!(warning.requested, SourcePreference::Glasses);
    assert_eq!(warnings.try_recv().unwrap(), warning);

    engine.sessions.release(lease).await.unwrap();
}

/// WHAT: GLASSES without Bluetooth records from the phone and warns
/// WHY: The request is honoured as closely as the hardware allows
#[tokio::test]
async fn given_no_bluetooth_when_acquiring_glasses_then_built_in_with_warning() {
    // Given: No Bluetooth devices
    let engine = Engine::new();

    // When: Acquiring a GLASSES recording lease
    let lease = engine
        .sessions
        .acquire(SourcePreference::Glasses, SessionPurpose::Recording)
        .await
        .unwrap();

    // Then: Built-in input and a DEVICE_UNAVAILABLE warning
    assert_eq!(lease.input.as_ref().map(|d| d.kind), Some(DeviceKind::BuiltInMic));
    assert_eq!(
        lease.warning.as_ref().map(|w| w.code),
        Some(ErrorCode::DeviceUnavailable)
    );
    assert!(!engine.platform.is_sco_on());
    engine.sessions.release(lease).await.unwrap();
}

/// WHAT: PHONE ignores attached glasses
/// WHY: Explicit PHONE must never capture from Bluetooth
#[tokio::test]
async fn given_glasses_attached_when_acquiring_phone_recording_then_built_in_input() {
    // Given: Glasses attached
    let engine = Engine::new();
    engine.platform.connect_glasses(GLASSES);

    // When: Acquiring a PHONE lease
    let lease = engine
        .sessions
        .acquire(SourcePreference::Phone, SessionPurpose::Recording)
        .await
        .unwrap();

    // Then: Built-in microphone and speaker, no SCO
    assert_eq!(lease.input.as_ref().map(|d| d.kind), Some(DeviceKind::BuiltInMic));
    assert_eq!(lease.output.as_ref().map(|d| d.kind), Some(DeviceKind::BuiltInSpeaker));
    assert!(!engine.platform.is_sco_on());
    engine.sessions.release(lease).await.unwrap();
}

/// WHAT: The session stays up until the last lease is released
/// WHY: Recording and playback share one platform session
#[tokio::test]
async fn given_two_leases_when_releasing_one_then_session_stays_active() {
    // Given: A recording and a playback lease
    let engine = Engine::new();
    let recording = engine
        .sessions
        .acquire(SourcePreference::Auto, SessionPurpose::Recording)
        .await
        .unwrap();
    let playback = engine
        .sessions
        .acquire(SourcePreference::Auto, SessionPurpose::Playback)
        .await
        .unwrap();
    assert_eq!(engine.platform.session_activations(), 1);

    // When: Releasing the first
    engine.sessions.release(recording).await.unwrap();

    // Then: Still active; the second release tears it down
    assert!(engine.platform.is_session_active());
    assert_eq!(engine.sessions.lease_count().await, 1);
    engine.sessions.release(playback).await.unwrap();
    assert!(!engine.platform.is_session_active());
    assert!(!engine.sessions.is_active().await);
}

/// WHAT: A missing permission fails before the hardware is touched
/// WHY: Half-configured sessions are worse than a clear error
#[tokio::test]
async fn given_microphone_denied_when_acquiring_recording_then_permission_denied() {
    // Given: Microphone access denied
    let engine = Engine::new();
    engine.platform.deny_permission(Permission::Microphone);

    // When: Acquiring a recording lease
    let result = engine
        .sessions
        .acquire(SourcePreference::Phone, SessionPurpose::Recording)
        .await;

    // Then: PERMISSION_DENIED and no session activation
    assert_eq!(result.unwrap_err().code(), ErrorCode::PermissionDenied);
    assert_eq!(engine.platform.session_activations(), 0);

    // Then: Playback still works without the microphone
    let lease = engine
        .sessions
        .acquire(SourcePreference::Phone, SessionPurpose::Playback)
        .await
        .unwrap();
    engine.sessions.release(lease).await.unwrap();
}

/// WHAT: Activation failure surfaces as SESSION_CONFIGURATION_FAILED
/// WHY: Native errors never cross the engine boundary unclassified
#[tokio::test]
async fn given_activation_failure_when_acquiring_then_session_configuration_failed() {
    // Given: Session activation fails
    let engine = Engine::new();
    engine.platform.set_session_failure(true);

    // When: Acquiring
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        engine
            .sessions
            .acquire(SourcePreference::Auto, SessionPurpose::Playback),
    )
    .await
    .unwrap();

    // Then: Classified error, nothing leased
    assert_eq!(result.unwrap_err().code(), ErrorCode::SessionConfigurationFailed);
    assert_eq!(engine.sessions.lease_count().await, 0);
}

/// WHAT: A failed SCO request after activation leaves nothing configured
/// WHY: A failed first acquire must not leak the platform session or voice mode
#[tokio::test]
async fn given_sco_request_fails_when_acquiring_glasses_then_session_rolled_back() {
    // Given: Glasses attached but the SCO request is rejected
    let engine = Engine::new();
    engine.platform.connect_glasses(GLASSES);
    engine.platform.set_sco_failure(true);

    // When: Acquiring a GLASSES recording lease
    let result = engine
        .sessions
        .acquire(SourcePreference::Glasses, SessionPurpose::Recording)
        .await;

    // Then: The failure is reported and every step is undone
    assert_eq!(
        result.unwrap_err().code(),
        ErrorCode::SessionConfigurationFailed
    );
    assert!(!engine.platform.is_session_active());
    assert!(!engine.platform.communication_mode());
    assert!(!engine.sessions.is_active().await);
    assert_eq!(engine.sessions.lease_count().await, 0);

    // When: The SCO path recovers
    engine.platform.set_sco_failure(false);
    let lease = engine
        .sessions
        .acquire(SourcePreference::Glasses, SessionPurpose::Recording)
        .await
        .unwrap();

    // Then: A fresh acquire succeeds normally
    assert!(engine.platform.is_sco_on());
    engine.sessions.release(lease).await.unwrap();
}

/// WHAT: A failed upgrade to recording restores the playback session
/// WHY: Lease holders already playing must keep their configured session
#[tokio::test]
async fn given_playback_lease_when_recording_upgrade_fails_then_playback_session_restored() {
    // Given: A PHONE playback lease, then SCO requests start failing
    let engine = Engine::new();
    let playback = engine
        .sessions
        .acquire(SourcePreference::Phone, SessionPurpose::Playback)
        .await
        .unwrap();
    let before = engine.platform.active_session();
    engine.platform.connect_glasses(GLASSES);
    engine.platform.set_sco_failure(true);

    // When: A GLASSES recording tries to upgrade the session
    let result = engine
        .sessions
        .acquire(SourcePreference::Glasses, SessionPurpose::Recording)
        .await;

    // Then: The upgrade fails and the playback configuration is back
    assert!(result.is_err());
    assert_eq!(engine.platform.active_session(), before);
    assert!(!engine.platform.communication_mode());
    assert_eq!(engine.sessions.lease_count().await, 1);

    engine.sessions.release(playback).await.unwrap();
    assert!(!engine.platform.is_session_active());
}
