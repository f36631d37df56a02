use crate::{
    AudioPlatform, AudioRoute, DeviceKind, Permission, SessionMode, SimulatedPlatform,
    SourcePreference,
    route_monitor::route_from,
    session::{SessionPurpose, plan_session, required_permissions},
};

// Test constants
const RATE_HINT: u32 = 16_000;

fn route_of(platform: &SimulatedPlatform) -> AudioRoute {
    route_from(platform.snapshot().unwrap())
}

/// WHAT: PHONE pins both directions to built-in hardware even with glasses attached
/// WHY: The user explicitly asked for the phone microphone
#[test]
fn given_glasses_attached_when_planning_phone_recording_then_built_in_forced() {
    // Given: Glasses attached
    let platform = SimulatedPlatform::new();
    platform.connect_glasses("Frames");

    // When: Planning a PHONE recording
    let plan = plan_session(
        SourcePreference::Phone,
        SessionPurpose::Recording,
        &route_of(&platform),
        RATE_HINT,
    );

    // Then: Bluetooth disallowed, built-in devices preferred, no SCO
    assert!(plan.config.force_built_in);
    assert!(!plan.config.allow_bluetooth);
    assert!(!plan.use_sco);
    assert_eq!(
        plan.config.preferred_input.map(|d| d.kind),
        Some(DeviceKind::BuiltInMic)
    );
    assert_eq!(plan.fallback_reason, None);
}

/// WHAT: GLASSES with an HFP headset selects voice mode and SCO
/// WHY: Glasses microphones are only reachable over the SCO voice link
#[test]
fn given_hfp_glasses_when_planning_glasses_recording_then_voice_chat_with_sco() {
    // Given: Glasses attached
    let platform = SimulatedPlatform::new();
    platform.connect_glasses("Frames");

    // When: Planning a GLASSES recording
    let plan = plan_session(
        SourcePreference::Glasses,
        SessionPurpose::Recording,
        &route_of(&platform),
        RATE_HINT,
    );

    // Then: Voice chat routed to the glasses
    assert_eq!(plan.config.mode, SessionMode::VoiceChat);
    assert!(plan.use_sco);
    assert_eq!(
        plan.config.preferred_input.map(|d| d.kind),
        Some(DeviceKind::BluetoothHfp)
    );
}

/// WHAT: GLASSES without any Bluetooth device degrades to AUTO with a reason
/// WHY: Missing glasses are a warning, not a failed recording
#[test]
fn given_no_bluetooth_when_planning_glasses_recording_then_auto_fallback_with_reason() {
    // Given: Built-in devices only
    let platform = SimulatedPlatform::new();

    // When: Planning a GLASSES recording
    let plan = plan_session(
        SourcePreference::Glasses,
        SessionPurpose::Recording,
        &route_of(&platform),
        RATE_HINT,
    );

    // Then: AUTO configuration plus a fallback reason
    assert!(!plan.use_sco);
    assert!(plan.config.allow_bluetooth);
    assert_eq!(plan.config.mode, SessionMode::Default);
    assert!(plan.fallback_reason.is_some());
}

/// WHAT: GLASSES playback on an A2DP-only device stays in media mode
/// WHY: A2DP has no voice link; requesting SCO would degrade quality
#[test]
fn given_a2dp_output_when_planning_glasses_playback_then_media_mode_without_sco() {
    // Given: An A2DP speaker
    let platform = SimulatedPlatform::new();
    platform.connect_bluetooth_output("Speaker");

    // When: Planning GLASSES playback
    let plan = plan_session(
        SourcePreference::Glasses,
        SessionPurpose::Playback,
        &route_of(&platform),
        RATE_HINT,
    );

    // Then: Routed to the speaker without SCO
    assert!(!plan.use_sco);
    assert_eq!(plan.config.mode, SessionMode::Default);
    assert_eq!(
        plan.config.preferred_output.map(|d| d.kind),
        Some(DeviceKind::BluetoothA2dp)
    );
}

/// WHAT: Permission requirements depend on purpose and preference
/// WHY: Playback must not demand microphone access
#[test]
fn given_purposes_when_listing_permissions_then_microphone_only_for_recording() {
    // Given/When: Requirements for three combinations
    let record_glasses = required_permissions(SourcePreference::Glasses, SessionPurpose::Recording);
    let play_auto = required_permissions(SourcePreference::Auto, SessionPurpose::Playback);

    // Then: Microphone and Bluetooth only where needed
    assert_eq!(
        record_glasses,
        vec![
            Permission::Microphone,
            Permission::AudioSettings,
            Permission::BluetoothConnect
        ]
    );
    assert_eq!(play_auto, vec![Permission::AudioSettings]);
}
