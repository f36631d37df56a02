use crate::{
    model::{AudioDevice, DeviceKind, Permission},
    platform::{
        AudioPlatform, AudioStream, CaptureSink, PlatformError, PlatformEvent, PlatformResult,
        RenderSource, RouteSnapshot, SessionConfig, StreamErrorSink, StreamFormat,
    },
};

use std::{
    panic::Location,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use cpal::{
    Device, DeviceType, FromSample, InterfaceType, Sample, SampleFormat, SizedSample, Stream,
    StreamConfig, SupportedStreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Input,
    Output,
}

#[derive(Debug, Default)]
struct CpalState {
    session: Option<SessionConfig>,
    communication_mode: bool,
    sco_on: bool,
}

/// Desktop adapter over cpal's default host.
///
/// Desktop hosts route Bluetooth voice links themselves, so the SCO request
/// is confirmed immediately; routing preferences are honoured by opening
/// streams on the selected device.
pub struct CpalPlatform {
    events: broadcast::Sender<PlatformEvent>,
    state: Mutex<CpalState>,
}

impl CpalPlatform {
    #[instrument]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        info!(host = ?cpal::default_host().id(), "CpalPlatform initialized");
        Self {
            events,
            state: Mutex::new(CpalState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, CpalState> {
        self.state.lock().unwrap_or_else(|e| {
            error!("Adapter state lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    fn notify(&self, event: PlatformEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for CpalPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlatform for CpalPlatform {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn check_permission(&self, _permission: Permission) -> bool {
        // Desktop hosts prompt on first stream open instead of up front.
        true
    }

    #[track_caller]
    fn snapshot(&self) -> PlatformResult<RouteSnapshot> {
        let host = cpal::default_host();

        let available_inputs: Vec<AudioDevice> = host
            .input_devices()
            .map_err(|e| PlatformError::Enumeration {
                reason: format!("Failed to list input devices: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .filter_map(|d| describe(&d, Direction::Input))
            .collect();

        let available_outputs: Vec<AudioDevice> = host
            .output_devices()
            .map_err(|e| PlatformError::Enumeration {
                reason: format!("Failed to list output devices: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .filter_map(|d| describe(&d, Direction::Output))
            .collect();

        let default_input = host
            .default_input_device()
            .and_then(|d| describe(&d, Direction::Input));
        let default_output = host
            .default_output_device()
            .and_then(|d| describe(&d, Direction::Output));

        let sample_rate = host
            .default_output_device()
            .and_then(|d| d.default_output_config().ok())
            .map(|c| c.sample_rate())
            .unwrap_or(0);

        let state = self.state();
        let session = state.session.as_ref();

        let routed_inputs = routed(
            &available_inputs,
            session.and_then(|s| s.preferred_input.as_ref()),
            session.is_some_and(|s| s.force_built_in),
            default_input,
        );
        let routed_outputs = routed(
            &available_outputs,
            session.and_then(|s| s.preferred_output.as_ref()),
            session.is_some_and(|s| s.force_built_in),
            default_output,
        );

        Ok(RouteSnapshot {
            routed_inputs,
            routed_outputs,
            available_inputs,
            available_outputs,
            sco_on: state.sco_on,
            sample_rate,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.events.subscribe()
    }

    #[instrument(skip(self))]
    fn apply_session(&self, config: &SessionConfig) -> PlatformResult<()> {
        self.state().session = Some(config.clone());
        debug!(category = ?config.category, mode = ?config.mode, "Session applied");
        self.notify(PlatformEvent::RouteChanged);
        Ok(())
    }

    fn deactivate_session(&self) -> PlatformResult<()> {
        self.state().session = None;
        self.notify(PlatformEvent::RouteChanged);
        Ok(())
    }

    fn set_communication_mode(&self, enabled: bool) -> PlatformResult<()> {
        self.state().communication_mode = enabled;
        debug!(enabled, "Communication mode set");
        Ok(())
    }

    fn request_sco(&self, connect: bool) -> PlatformResult<()> {
        self.state().sco_on = connect;
        self.notify(if connect {
            PlatformEvent::ScoConnected
        } else {
            PlatformEvent::ScoDisconnected
        });
        Ok(())
    }

    #[track_caller]
    #[instrument(skip(self, sink, on_error))]
    fn open_capture(
        &self,
        device: Option<&AudioDevice>,
        preferred_sample_rate: u32,
        sink: CaptureSink,
        on_error: StreamErrorSink,
    ) -> PlatformResult<Box<dyn AudioStream>> {
        let device = select_device(device, Direction::Input)?;
        let supported = preferred_config(&device, Direction::Input, preferred_sample_rate, None)?;
        let config: StreamConfig = supported.config();
        let active = Arc::new(AtomicBool::new(false));

        let stream = match supported.sample_format() {
            SampleFormat::I16 => build_capture::<i16>(&device, &config, sink, on_error, &active),
            SampleFormat::U16 => build_capture::<u16>(&device, &config, sink, on_error, &active),
            _ => build_capture::<f32>(&device, &config, sink, on_error, &active),
        }?;

        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            format = ?supported.sample_format(),
            "Capture stream opened"
        );

        Ok(Box::new(CpalStream {
            stream: Some(stream),
            format: StreamFormat {
                sample_rate: config.sample_rate,
                channels: config.channels,
            },
            active,
        }))
    }

    #[track_caller]
    #[instrument(skip(self, source, on_error))]
    fn open_render(
        &self,
        device: Option<&AudioDevice>,
        requested: StreamFormat,
        source: RenderSource,
        on_error: StreamErrorSink,
    ) -> PlatformResult<Box<dyn AudioStream>> {
        let device = select_device(device, Direction::Output)?;
        let supported = preferred_config(
            &device,
            Direction::Output,
            requested.sample_rate,
            Some(requested.channels),
        )?;
        let config: StreamConfig = supported.config();
        let active = Arc::new(AtomicBool::new(false));

        let stream = match supported.sample_format() {
            SampleFormat::I16 => build_render::<i16>(&device, &config, source, on_error, &active),
            SampleFormat::U16 => build_render::<u16>(&device, &config, source, on_error, &active),
            _ => build_render::<f32>(&device, &config, source, on_error, &active),
        }?;

        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            "Render stream opened"
        );

        Ok(Box::new(CpalStream {
            stream: Some(stream),
            format: StreamFormat {
                sample_rate: config.sample_rate,
                channels: config.channels,
            },
            active,
        }))
    }
}

/// cpal stream with an explicit delivery gate.
struct CpalStream {
    stream: Option<Stream>,
    format: StreamFormat,
    /// Callbacks drop data while this is `false`. Cleared before the stream
    /// is paused or dropped so no in-flight callback delivers afterwards.
    active: Arc<AtomicBool>,
}

impl AudioStream for CpalStream {
    fn format(&self) -> StreamFormat {
        self.format
    }

    #[track_caller]
    fn start(&mut self) -> PlatformResult<()> {
        let stream = self.stream.as_ref().ok_or_else(|| PlatformError::Stream {
            reason: "Stream already stopped".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        self.active.store(true, Ordering::Release);
        stream.play().map_err(|e| PlatformError::Stream {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    fn pause(&mut self) -> PlatformResult<()> {
        self.active.store(false, Ordering::Release);
        if let Some(stream) = self.stream.as_ref() {
            if let Err(e) = stream.pause() {
                // Not every device can suspend; the gate already holds delivery.
                debug!(error = %e, "Hardware pause unsupported, gating callbacks");
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> PlatformResult<()> {
        self.active.store(false, Ordering::Release);

        if let Some(stream) = self.stream.take() {
            drop(stream);
            // Let any in-flight callback observe the gate before we return.
            std::thread::sleep(Duration::from_millis(5));
            debug!("Stream stopped");
        }
        Ok(())
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn build_capture<T>(
    device: &Device,
    config: &StreamConfig,
    mut sink: CaptureSink,
    mut on_error: StreamErrorSink,
    active: &Arc<AtomicBool>,
) -> PlatformResult<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let active = Arc::clone(active);
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !active.load(Ordering::Acquire) {
                    return;
                }
                scratch.clear();
                scratch.extend(data.iter().map(|&s| <f32 as FromSample<T>>::from_sample_(s)));
                sink(&scratch);
            },
            move |err| {
                error!("Audio capture stream error: {}", err);
                on_error(PlatformError::Stream {
                    reason: err.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            },
            None,
        )
        .map_err(|e| PlatformError::Stream {
            reason: format!("Failed to build capture stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
}

fn build_render<T>(
    device: &Device,
    config: &StreamConfig,
    mut source: RenderSource,
    mut on_error: StreamErrorSink,
    active: &Arc<AtomicBool>,
) -> PlatformResult<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let active = Arc::clone(active);
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if !active.load(Ordering::Acquire) {
                    data.fill(T::EQUILIBRIUM);
                    return;
                }
                scratch.clear();
                scratch.resize(data.len(), 0.0);
                source(&mut scratch);
                for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample_(sample);
                }
            },
            move |err| {
                error!("Audio render stream error: {}", err);
                on_error(PlatformError::Stream {
                    reason: err.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            },
            None,
        )
        .map_err(|e| PlatformError::Stream {
            reason: format!("Failed to build render stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
}

#[track_caller]
fn select_device(device: Option<&AudioDevice>, direction: Direction) -> PlatformResult<Device> {
    let host = cpal::default_host();

    let found = match device {
        Some(wanted) => {
            let candidates = match direction {
                Direction::Input => host.input_devices(),
                Direction::Output => host.output_devices(),
            }
            .map_err(|e| PlatformError::Enumeration {
                reason: format!("Failed to list devices: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            candidates
                .into_iter()
                .find(|d| device_id(d).is_some_and(|id| id == wanted.id))
        }
        None => match direction {
            Direction::Input => host.default_input_device(),
            Direction::Output => host.default_output_device(),
        },
    };

    found.ok_or_else(|| PlatformError::DeviceNotFound {
        reason: match device {
            Some(d) => format!("{} ({})", d.display_name, d.id),
            None => format!("no default {:?} device", direction),
        },
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Pick a config honouring the rate hint (and channel count for render)
/// when the device supports it, else the device default.
#[track_caller]
fn preferred_config(
    device: &Device,
    direction: Direction,
    sample_rate: u32,
    channels: Option<u16>,
) -> PlatformResult<SupportedStreamConfig> {
    let usable = |format: SampleFormat| {
        matches!(format, SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16)
    };

    let hinted = match direction {
        Direction::Input => device.supported_input_configs().ok().and_then(|mut configs| {
            configs.find(|c| {
                usable(c.sample_format())
                    && c.min_sample_rate() <= sample_rate
                    && c.max_sample_rate() >= sample_rate
            })
        }),
        Direction::Output => device.supported_output_configs().ok().and_then(|mut configs| {
            configs.find(|c| {
                usable(c.sample_format())
                    && channels.is_none_or(|ch| c.channels() == ch)
                    && c.min_sample_rate() <= sample_rate
                    && c.max_sample_rate() >= sample_rate
            })
        }),
    };

    if let Some(range) = hinted {
        return Ok(range.with_sample_rate(sample_rate));
    }

    warn!(
        sample_rate,
        ?direction,
        "Rate hint not supported by device, using its default config"
    );

    match direction {
        Direction::Input => device.default_input_config(),
        Direction::Output => device.default_output_config(),
    }
    .map_err(|e| PlatformError::Stream {
        reason: format!("Failed to get config: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })
}

fn device_id(device: &Device) -> Option<String> {
    device
        .id()
        .map(|id| id.to_string())
        .ok()
        .or_else(|| device.description().ok().map(|d| d.name().to_string()))
}

fn describe(device: &Device, direction: Direction) -> Option<AudioDevice> {
    let description = device.description().ok()?;
    let id = device_id(device)?;
    let kind = classify(description.interface_type(), description.device_type(), direction);
    Some(AudioDevice::new(id, kind, description.name()))
}

/// Classify each direction on its own: a Bluetooth headset may be routed for
/// output while capture stays on the built-in microphone.
pub(crate) fn classify(
    interface: InterfaceType,
    device_type: DeviceType,
    direction: Direction,
) -> DeviceKind {
    match (interface, direction) {
        // Bluetooth capture is only ever the voice (HFP) profile.
        (InterfaceType::Bluetooth, Direction::Input) => DeviceKind::BluetoothHfp,
        (InterfaceType::Bluetooth, Direction::Output) if device_type == DeviceType::Headset => {
            DeviceKind::BluetoothHfp
        }
        (InterfaceType::Bluetooth, Direction::Output) => DeviceKind::BluetoothA2dp,
        (InterfaceType::Usb, _) => DeviceKind::Wired,
        (_, Direction::Input) if device_type == DeviceType::Headset => DeviceKind::Wired,
        (_, Direction::Output)
            if matches!(device_type, DeviceType::Headset | DeviceType::Headphones) =>
        {
            DeviceKind::Wired
        }
        (_, Direction::Input) => DeviceKind::BuiltInMic,
        (_, Direction::Output) => DeviceKind::BuiltInSpeaker,
    }
}

pub(crate) fn routed(
    available: &[AudioDevice],
    preferred: Option<&AudioDevice>,
    force_built_in: bool,
    default: Option<AudioDevice>,
) -> Vec<AudioDevice> {
    let chosen = preferred
        .and_then(|p| available.iter().find(|d| d.id == p.id).cloned())
        .or_else(|| {
            force_built_in
                .then(|| available.iter().find(|d| d.kind.is_built_in()).cloned())
                .flatten()
        })
        .or(default);

    chosen.into_iter().collect()
}
