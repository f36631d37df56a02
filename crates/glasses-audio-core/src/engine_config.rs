use std::time::Duration;

use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_ROUTE_POLL_INTERVAL_MS: u64 = 2_000;
pub(crate) const DEFAULT_SCO_SETTLE_DELAY_MS: u64 = 500;
pub(crate) const DEFAULT_SPEECH_INTER_ITEM_DELAY_MS: u64 = 500;
pub(crate) const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 250;
pub(crate) const DEFAULT_TARGET_SAMPLE_RATE: u32 = 16_000;
pub(crate) const DEFAULT_HEADER_SYNC_INTERVAL_MS: u64 = 1_000;

fn default_route_poll_interval_ms() -> u64 {
    DEFAULT_ROUTE_POLL_INTERVAL_MS
}

fn default_sco_settle_delay_ms() -> u64 {
    DEFAULT_SCO_SETTLE_DELAY_MS
}

fn default_speech_inter_item_delay_ms() -> u64 {
    DEFAULT_SPEECH_INTER_ITEM_DELAY_MS
}

fn default_progress_interval_ms() -> u64 {
    DEFAULT_PROGRESS_INTERVAL_MS
}

fn default_target_sample_rate() -> u32 {
    DEFAULT_TARGET_SAMPLE_RATE
}

fn default_header_sync_interval_ms() -> u64 {
    DEFAULT_HEADER_SYNC_INTERVAL_MS
}

/// Engine timing and format settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Backstop poll period of the route monitor.
    #[serde(default = "default_route_poll_interval_ms")]
    pub route_poll_interval_ms: u64,
    /// Upper bound on waiting for the SCO "connected" event.
    #[serde(default = "default_sco_settle_delay_ms")]
    pub sco_settle_delay_ms: u64,
    /// Gap between replayed speech items.
    #[serde(default = "default_speech_inter_item_delay_ms")]
    pub speech_inter_item_delay_ms: u64,
    /// Period of recording progress events.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    /// Sample rate of recorded files.
    #[serde(default = "default_target_sample_rate")]
    pub target_sample_rate: u32,
    /// How often the WAV header is patched during capture.
    #[serde(default = "default_header_sync_interval_ms")]
    pub header_sync_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            route_poll_interval_ms: DEFAULT_ROUTE_POLL_INTERVAL_MS,
            sco_settle_delay_ms: DEFAULT_SCO_SETTLE_DELAY_MS,
            speech_inter_item_delay_ms: DEFAULT_SPEECH_INTER_ITEM_DELAY_MS,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            target_sample_rate: DEFAULT_TARGET_SAMPLE_RATE,
            header_sync_interval_ms: DEFAULT_HEADER_SYNC_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    /// Route poll period.
    pub fn route_poll_interval(&self) -> Duration {
        Duration::from_millis(self.route_poll_interval_ms.max(1))
    }

    /// SCO settle bound.
    pub fn sco_settle_delay(&self) -> Duration {
        Duration::from_millis(self.sco_settle_delay_ms)
    }

    /// Gap between replayed speech items.
    pub fn speech_inter_item_delay(&self) -> Duration {
        Duration::from_millis(self.speech_inter_item_delay_ms)
    }

    /// Progress event period.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    /// Header patch period.
    pub fn header_sync_interval(&self) -> Duration {
        Duration::from_millis(self.header_sync_interval_ms.max(1))
    }
}
