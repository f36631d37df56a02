use crate::{
    model::{AudioRoute, DeviceKind, Permission, SourcePreference},
    platform::{SessionCategory, SessionConfig, SessionMode},
    session::SessionPurpose,
};

/// Concrete configuration chosen for a preference on a given route.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SessionPlan {
    pub(crate) config: SessionConfig,
    pub(crate) use_sco: bool,
    /// Set when the preference could not be honoured on this route.
    pub(crate) fallback_reason: Option<String>,
}

/// Permissions an operation needs before anything touches the hardware.
pub(crate) fn required_permissions(
    preference: SourcePreference,
    purpose: SessionPurpose,
) -> Vec<Permission> {
    let mut permissions = Vec::with_capacity(3);
    if purpose == SessionPurpose::Recording {
        permissions.push(Permission::Microphone);
    }
    permissions.push(Permission::AudioSettings);
    if preference == SourcePreference::Glasses {
        permissions.push(Permission::BluetoothConnect);
    }
    permissions
}

/// Translate a preference into a session configuration for `route`.
///
/// `PHONE` pins both directions to built-in devices. `GLASSES` routes to the
/// wearable and asks for SCO when the endpoint is hands-free, falling back to
/// the `AUTO` configuration when nothing suitable is attached. `AUTO` lets the
/// OS pick, Bluetooth included.
pub(crate) fn plan_session(
    preference: SourcePreference,
    purpose: SessionPurpose,
    route: &AudioRoute,
    sample_rate_hint: u32,
) -> SessionPlan {
    let category = match purpose {
        SessionPurpose::Recording => SessionCategory::PlayAndRecord,
        SessionPurpose::Playback => SessionCategory::Playback,
    };
    let auto = SessionConfig {
        category,
        mode: SessionMode::Default,
        allow_bluetooth: true,
        force_built_in: false,
        preferred_sample_rate: sample_rate_hint,
        preferred_input: None,
        preferred_output: None,
    };

    match preference {
        SourcePreference::Auto => SessionPlan {
            config: auto,
            use_sco: false,
            fallback_reason: None,
        },
        SourcePreference::Phone => SessionPlan {
            config: SessionConfig {
                allow_bluetooth: false,
                force_built_in: true,
                preferred_input: match purpose {
                    SessionPurpose::Recording => route.built_in_input().cloned(),
                    SessionPurpose::Playback => None,
                },
                preferred_output: route.built_in_output().cloned(),
                ..auto
            },
            use_sco: false,
            fallback_reason: None,
        },
        SourcePreference::Glasses => match purpose {
            SessionPurpose::Recording => match route.bluetooth_voice_input() {
                Some(input) => SessionPlan {
                    config: SessionConfig {
                        mode: SessionMode::VoiceChat,
                        preferred_input: Some(input.clone()),
                        preferred_output: route.bluetooth_output().cloned(),
                        ..auto
                    },
                    use_sco: input.kind == DeviceKind::BluetoothHfp,
                    fallback_reason: None,
                },
                None => SessionPlan {
                    config: auto,
                    use_sco: false,
                    fallback_reason: Some(
                        "no Bluetooth microphone attached, recording from the built-in microphone"
                            .to_string(),
                    ),
                },
            },
            SessionPurpose::Playback => match route.bluetooth_output() {
                Some(output) => {
                    let hands_free = output.kind == DeviceKind::BluetoothHfp;
                    SessionPlan {
                        config: SessionConfig {
                            mode: if hands_free {
                                SessionMode::VoiceChat
                            } else {
                                SessionMode::Default
                            },
                            preferred_output: Some(output.clone()),
                            ..auto
                        },
                        use_sco: hands_free,
                        fallback_reason: None,
                    }
                }
                None => SessionPlan {
                    config: auto,
                    use_sco: false,
                    fallback_reason: Some(
                        "no Bluetooth output attached, playing through the phone".to_string(),
                    ),
                },
            },
        },
    }
}
