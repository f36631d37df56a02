use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime permissions the engine depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    /// Record audio.
    Microphone,
    /// Connect to paired Bluetooth devices.
    BluetoothConnect,
    /// Change audio routing and mode.
    AudioSettings,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Microphone => "microphone",
            Permission::BluetoothConnect => "bluetooth-connect",
            Permission::AudioSettings => "audio-settings",
        };
        f.write_str(name)
    }
}
