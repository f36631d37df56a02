use crate::model::AudioDevice;

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Snapshot of the current hardware routing.
///
/// `inputs`/`outputs` are the endpoints the OS is routing through right now;
/// `available_*` lists everything attached. Never cache device identity
/// across snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRoute {
    /// Routed capture endpoints.
    pub inputs: Vec<AudioDevice>,
    /// Routed render endpoints.
    pub outputs: Vec<AudioDevice>,
    /// Every attached capture endpoint.
    pub available_inputs: Vec<AudioDevice>,
    /// Every attached render endpoint.
    pub available_outputs: Vec<AudioDevice>,
    /// Any Bluetooth endpoint is attached, in either direction.
    pub is_bluetooth_connected: bool,
    /// The SCO voice link is up.
    pub is_sco_on: bool,
    /// Hardware sample rate in Hz.
    pub sample_rate: u32,
    /// When the snapshot was taken.
    pub timestamp: SystemTime,
}

impl AudioRoute {
    /// Route with no devices, used before the first successful enumeration.
    pub fn empty() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            available_inputs: Vec::new(),
            available_outputs: Vec::new(),
            is_bluetooth_connected: false,
            is_sco_on: false,
            sample_rate: 0,
            timestamp: SystemTime::now(),
        }
    }

    /// Compare hardware content, ignoring the timestamp.
    pub fn same_hardware(&self, other: &AudioRoute) -> bool {
        self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.available_inputs == other.available_inputs
            && self.available_outputs == other.available_outputs
            && self.is_bluetooth_connected == other.is_bluetooth_connected
            && self.is_sco_on == other.is_sco_on
            && self.sample_rate == other.sample_rate
    }

    /// Routed input is Bluetooth.
    pub fn has_bluetooth_input(&self) -> bool {
        self.inputs.iter().any(|d| d.kind.is_bluetooth())
    }

    /// Routed output is Bluetooth.
    pub fn has_bluetooth_output(&self) -> bool {
        self.outputs.iter().any(|d| d.kind.is_bluetooth())
    }

    /// First attached Bluetooth endpoint able to capture voice.
    pub fn bluetooth_voice_input(&self) -> Option<&AudioDevice> {
        self.available_inputs
            .iter()
            .find(|d| d.kind.is_bluetooth() && d.kind.can_capture())
    }

    /// First attached Bluetooth render endpoint, preferring voice-capable ones.
    pub fn bluetooth_output(&self) -> Option<&AudioDevice> {
        let outputs = || self.available_outputs.iter().filter(|d| d.kind.is_bluetooth());
        outputs()
            .find(|d| d.kind.can_capture())
            .or_else(|| outputs().next())
    }

    /// Display name of the attached Bluetooth device, if any.
    pub fn bluetooth_device_name(&self) -> Option<&str> {
        self.available_inputs
            .iter()
            .chain(self.available_outputs.iter())
            .find(|d| d.kind.is_bluetooth())
            .map(|d| d.display_name.as_str())
    }

    /// First attached built-in microphone.
    pub fn built_in_input(&self) -> Option<&AudioDevice> {
        self.available_inputs.iter().find(|d| d.kind.is_built_in())
    }

    /// First attached built-in speaker.
    pub fn built_in_output(&self) -> Option<&AudioDevice> {
        self.available_outputs.iter().find(|d| d.kind.is_built_in())
    }
}
