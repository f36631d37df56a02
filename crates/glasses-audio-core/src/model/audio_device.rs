use serde::{Deserialize, Serialize};

/// Physical class of an audio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    /// Phone's built-in microphone.
    BuiltInMic,
    /// Phone's built-in speaker or earpiece.
    BuiltInSpeaker,
    /// Bluetooth Hands-Free profile (voice-grade, bidirectional, needs SCO).
    #[serde(rename = "bluetooth-hfp")]
    BluetoothHfp,
    /// Bluetooth A2DP (high fidelity, output only).
    #[serde(rename = "bluetooth-a2dp")]
    BluetoothA2dp,
    /// Bluetooth Low Energy audio.
    #[serde(rename = "bluetooth-le")]
    BluetoothLe,
    /// Wired headset, USB or line device.
    Wired,
}

impl DeviceKind {
    /// Whether the endpoint is reached over Bluetooth.
    pub fn is_bluetooth(self) -> bool {
        matches!(
            self,
            DeviceKind::BluetoothHfp | DeviceKind::BluetoothA2dp | DeviceKind::BluetoothLe
        )
    }

    /// Whether the endpoint is part of the phone itself.
    pub fn is_built_in(self) -> bool {
        matches!(self, DeviceKind::BuiltInMic | DeviceKind::BuiltInSpeaker)
    }

    /// Whether the endpoint can capture voice.
    pub fn can_capture(self) -> bool {
        !matches!(self, DeviceKind::BuiltInSpeaker | DeviceKind::BluetoothA2dp)
    }
}

/// One audio endpoint as reported in a route snapshot.
///
/// Identity is only meaningful within the snapshot it came from; the OS may
/// reassign ids between snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDevice {
    /// Platform identifier.
    pub id: String,
    /// Endpoint class.
    pub kind: DeviceKind,
    /// Name suitable for display.
    pub display_name: String,
}

impl AudioDevice {
    /// Build a device description.
    pub fn new(id: impl Into<String>, kind: DeviceKind, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            display_name: display_name.into(),
        }
    }
}
