//! Native adapter seam.
//!
//! Every platform speaks the same connect → settle → active → teardown
//! vocabulary through [`AudioPlatform`]; shared engine code never branches
//! on which adapter is behind it.

mod cpal_platform;
mod error;
mod simulated;

pub use {
    cpal_platform::CpalPlatform,
    error::{PlatformError, Result as PlatformResult},
    simulated::{SimulatedDevices, SimulatedPlatform},
};

#[cfg(test)]
pub(crate) use cpal_platform::{Direction, classify, routed};

use crate::model::{AudioDevice, Permission};

use std::{panic::Location, sync::Arc};

use error_location::ErrorLocation;
use tokio::sync::broadcast;

/// Native-format capture callback, receiving interleaved `f32` frames.
pub type CaptureSink = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// Render callback filling an interleaved `f32` buffer.
pub type RenderSource = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Receives asynchronous stream failures (device lost, driver error).
pub type StreamErrorSink = Box<dyn FnMut(PlatformError) + Send + 'static>;

/// Sample rate and channel count of an open stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Frames per second.
    pub sample_rate: u32,
    /// Interleaved channels.
    pub channels: u16,
}

/// What the session is being configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCategory {
    /// Capture and render.
    PlayAndRecord,
    /// Render only.
    Playback,
}

/// Processing mode requested from the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Media processing.
    Default,
    /// Voice communication (enables the SCO path).
    VoiceChat,
}

/// Concrete platform session configuration derived from a source preference.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Capture/render category.
    pub category: SessionCategory,
    /// Processing mode.
    pub mode: SessionMode,
    /// Bluetooth routes may be used.
    pub allow_bluetooth: bool,
    /// Built-in devices must be used even if Bluetooth is attached.
    pub force_built_in: bool,
    /// Requested hardware rate; a hint the hardware may ignore.
    pub preferred_sample_rate: u32,
    /// Capture endpoint to route to.
    pub preferred_input: Option<AudioDevice>,
    /// Render endpoint to route to.
    pub preferred_output: Option<AudioDevice>,
}

/// Raw enumeration result from an adapter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteSnapshot {
    /// Currently routed capture endpoints.
    pub routed_inputs: Vec<AudioDevice>,
    /// Currently routed render endpoints.
    pub routed_outputs: Vec<AudioDevice>,
    /// Every attached capture endpoint.
    pub available_inputs: Vec<AudioDevice>,
    /// Every attached render endpoint.
    pub available_outputs: Vec<AudioDevice>,
    /// SCO link is up.
    pub sco_on: bool,
    /// Hardware sample rate.
    pub sample_rate: u32,
}

/// Asynchronous notifications raised by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// Devices were attached, detached or rerouted.
    RouteChanged,
    /// The SCO voice link came up.
    ScoConnected,
    /// The SCO voice link went down.
    ScoDisconnected,
    /// The OS took the audio device (phone call, alarm).
    InterruptionBegan,
    /// The OS released the audio device.
    InterruptionEnded {
        /// The OS allows resuming what was interrupted.
        should_resume: bool,
    },
}

/// One open hardware stream.
pub trait AudioStream: Send {
    /// Actual format negotiated with the hardware.
    fn format(&self) -> StreamFormat;
    /// Start or resume delivering callbacks.
    fn start(&mut self) -> PlatformResult<()>;
    /// Hold callbacks without releasing the stream.
    fn pause(&mut self) -> PlatformResult<()>;
    /// Stop for good; no callback runs after this returns.
    fn stop(&mut self) -> PlatformResult<()>;
}

/// Native audio stack adapter.
///
/// Methods may block briefly (session activation, SCO requests) and are
/// called from blocking worker threads, never from an async context directly.
pub trait AudioPlatform: Send + Sync + 'static {
    /// Adapter name for logs.
    fn name(&self) -> &'static str;

    /// Whether a runtime permission has been granted.
    fn check_permission(&self, permission: Permission) -> bool;

    /// Enumerate routed and attached devices.
    fn snapshot(&self) -> PlatformResult<RouteSnapshot>;

    /// Subscribe to route, SCO and interruption notifications.
    fn subscribe(&self) -> broadcast::Receiver<PlatformEvent>;

    /// Apply category, mode, options and routing, then activate the session.
    fn apply_session(&self, config: &SessionConfig) -> PlatformResult<()>;

    /// Deactivate the session and restore default routing.
    fn deactivate_session(&self) -> PlatformResult<()>;

    /// Enter or leave communication mode.
    fn set_communication_mode(&self, enabled: bool) -> PlatformResult<()>;

    /// Request the SCO link up or down; completion arrives as a [`PlatformEvent`].
    fn request_sco(&self, connect: bool) -> PlatformResult<()>;

    /// Open a capture stream on `device` (or the routed default). Not started.
    fn open_capture(
        &self,
        device: Option<&AudioDevice>,
        preferred_sample_rate: u32,
        sink: CaptureSink,
        on_error: StreamErrorSink,
    ) -> PlatformResult<Box<dyn AudioStream>>;

    /// Open a render stream on `device` (or the routed default). Not started.
    ///
    /// `requested` is a hint; the returned stream reports the real format.
    fn open_render(
        &self,
        device: Option<&AudioDevice>,
        requested: StreamFormat,
        source: RenderSource,
        on_error: StreamErrorSink,
    ) -> PlatformResult<Box<dyn AudioStream>>;
}

/// Run a blocking adapter call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(platform: &Arc<dyn AudioPlatform>, call: F) -> PlatformResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn AudioPlatform) -> PlatformResult<T> + Send + 'static,
{
    let platform = Arc::clone(platform);
    match tokio::task::spawn_blocking(move || call(platform.as_ref())).await {
        Ok(result) => result,
        Err(e) => Err(PlatformError::Session {
            reason: format!("platform task failed: {}", e),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}
