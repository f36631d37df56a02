use crate::{
    model::{AudioDevice, DeviceKind, Permission},
    platform::{
        AudioPlatform, AudioStream, CaptureSink, PlatformError, PlatformEvent, PlatformResult,
        RenderSource, RouteSnapshot, SessionConfig, StreamErrorSink, StreamFormat,
    },
};

use std::{
    collections::{HashMap, HashSet},
    f32::consts::TAU,
    panic::Location,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::JoinHandle,
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

const EVENT_CAPACITY: usize = 64;
const SCO_SAMPLE_RATE: u32 = 16_000;

/// Default attached hardware of a simulated phone.
#[derive(Debug, Clone)]
pub struct SimulatedDevices {
    /// Built-in microphone.
    pub built_in_input: AudioDevice,
    /// Built-in speaker.
    pub built_in_output: AudioDevice,
}

impl Default for SimulatedDevices {
    fn default() -> Self {
        Self {
            built_in_input: AudioDevice::new("builtin-mic", DeviceKind::BuiltInMic, "Phone Microphone"),
            built_in_output: AudioDevice::new(
                "builtin-speaker",
                DeviceKind::BuiltInSpeaker,
                "Phone Speaker",
            ),
        }
    }
}

struct SimState {
    devices: SimulatedDevices,
    bluetooth_inputs: Vec<AudioDevice>,
    bluetooth_outputs: Vec<AudioDevice>,
    session: Option<SessionConfig>,
    session_activations: u64,
    communication_mode: bool,
    sco_requested: bool,
    sco_on: bool,
    sco_latency: Option<Duration>,
    route_notifications: bool,
    fail_enumeration: bool,
    fail_session: bool,
    fail_sco: bool,
    denied: HashSet<Permission>,
    capture_format: StreamFormat,
    render_format: StreamFormat,
    hardware_rate: u32,
    error_sinks: HashMap<u64, Arc<Mutex<StreamErrorSink>>>,
    next_stream_id: u64,
}

/// In-process adapter with scriptable hardware.
///
/// Models a phone with a built-in microphone and speaker. Bluetooth devices
/// can be attached and detached, SCO connects after a configurable latency
/// (or never), and capture produces a steady tone in real time at the
/// configured native format. Routing follows the applied [`SessionConfig`]
/// the way a mobile OS would.
pub struct SimulatedPlatform {
    state: Arc<Mutex<SimState>>,
    events: broadcast::Sender<PlatformEvent>,
    block: Duration,
    captured_frames: Arc<AtomicU64>,
    rendered_frames: Arc<AtomicU64>,
}

impl SimulatedPlatform {
    /// Phone with built-in devices only; capture runs at 48 kHz stereo.
    pub fn new() -> Self {
        Self::with_devices(SimulatedDevices::default())
    }

    /// Phone with custom built-in devices.
    pub fn with_devices(devices: SimulatedDevices) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = SimState {
            devices,
            bluetooth_inputs: Vec::new(),
            bluetooth_outputs: Vec::new(),
            session: None,
            session_activations: 0,
            communication_mode: false,
            sco_requested: false,
            sco_on: false,
            sco_latency: Some(Duration::from_millis(20)),
            route_notifications: true,
            fail_enumeration: false,
            fail_session: false,
            fail_sco: false,
            denied: HashSet::new(),
            capture_format: StreamFormat {
                sample_rate: 48_000,
                channels: 2,
            },
            render_format: StreamFormat {
                sample_rate: 48_000,
                channels: 2,
            },
            hardware_rate: 48_000,
            error_sinks: HashMap::new(),
            next_stream_id: 0,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            events,
            block: Duration::from_millis(10),
            captured_frames: Arc::new(AtomicU64::new(0)),
            rendered_frames: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Native format of the built-in microphone.
    pub fn set_capture_format(&self, format: StreamFormat) {
        self.lock().capture_format = format;
    }

    /// Format the simulated speaker renders at.
    pub fn set_render_format(&self, format: StreamFormat) {
        self.lock().render_format = format;
    }

    /// Attach smart glasses exposing an HFP microphone and speaker.
    pub fn connect_glasses(&self, name: &str) {
        {
            let mut state = self.lock();
            let id = format!("bt-{}", name.to_ascii_lowercase().replace(' ', "-"));
            state
                .bluetooth_inputs
                .push(AudioDevice::new(format!("{id}-hfp-in"), DeviceKind::BluetoothHfp, name));
            state
                .bluetooth_outputs
                .push(AudioDevice::new(format!("{id}-hfp-out"), DeviceKind::BluetoothHfp, name));
        }
        info!(device = name, "Simulated glasses connected");
        self.notify_route_change();
    }

    /// Attach an output-only Bluetooth device (A2DP speaker or headphones).
    pub fn connect_bluetooth_output(&self, name: &str) {
        {
            let mut state = self.lock();
            let id = format!("bt-{}-a2dp", name.to_ascii_lowercase().replace(' ', "-"));
            state
                .bluetooth_outputs
                .push(AudioDevice::new(id, DeviceKind::BluetoothA2dp, name));
        }
        info!(device = name, "Simulated Bluetooth output connected");
        self.notify_route_change();
    }

    /// Detach every Bluetooth device, dropping SCO if it was up.
    pub fn disconnect_bluetooth(&self) {
        let sco_was_on = {
            let mut state = self.lock();
            state.bluetooth_inputs.clear();
            state.bluetooth_outputs.clear();
            std::mem::replace(&mut state.sco_on, false)
        };
        if sco_was_on {
            self.notify(PlatformEvent::ScoDisconnected);
        }
        self.notify_route_change();
    }

    /// Delay before a requested SCO link comes up; `None` never connects.
    pub fn set_sco_latency(&self, latency: Option<Duration>) {
        self.lock().sco_latency = latency;
    }

    /// Suppress route-change notifications so only polling observes changes.
    pub fn set_route_notifications(&self, enabled: bool) {
        self.lock().route_notifications = enabled;
    }

    /// Make enumeration fail until cleared.
    pub fn set_enumeration_failure(&self, failing: bool) {
        self.lock().fail_enumeration = failing;
    }

    /// Make session activation fail until cleared.
    pub fn set_session_failure(&self, failing: bool) {
        self.lock().fail_session = failing;
    }

    /// Make SCO connect requests fail until cleared.
    pub fn set_sco_failure(&self, failing: bool) {
        self.lock().fail_sco = failing;
    }

    /// Revoke a runtime permission.
    pub fn deny_permission(&self, permission: Permission) {
        self.lock().denied.insert(permission);
    }

    /// Grant a previously revoked permission.
    pub fn grant_permission(&self, permission: Permission) {
        self.lock().denied.remove(&permission);
    }

    /// The OS takes the audio device.
    pub fn begin_interruption(&self) {
        self.notify(PlatformEvent::InterruptionBegan);
    }

    /// The OS releases the audio device.
    pub fn end_interruption(&self, should_resume: bool) {
        self.notify(PlatformEvent::InterruptionEnded { should_resume });
    }

    /// Report a runtime failure on every open stream.
    pub fn inject_stream_error(&self, reason: &str) {
        let sinks: Vec<_> = self.lock().error_sinks.values().cloned().collect();
        for sink in sinks {
            let mut sink = sink.lock().unwrap_or_else(|e| e.into_inner());
            (*sink)(PlatformError::Stream {
                reason: reason.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    }

    /// A session is currently applied.
    pub fn is_session_active(&self) -> bool {
        self.lock().session.is_some()
    }

    /// Configuration currently applied.
    pub fn active_session(&self) -> Option<SessionConfig> {
        self.lock().session.clone()
    }

    /// How many times a session has been applied.
    pub fn session_activations(&self) -> u64 {
        self.lock().session_activations
    }

    /// SCO link state.
    pub fn is_sco_on(&self) -> bool {
        self.lock().sco_on
    }

    /// Communication mode state.
    pub fn communication_mode(&self) -> bool {
        self.lock().communication_mode
    }

    /// Streams opened and not yet stopped.
    pub fn open_streams(&self) -> usize {
        self.lock().error_sinks.len()
    }

    /// Frames delivered by capture streams.
    pub fn captured_frames(&self) -> u64 {
        self.captured_frames.load(Ordering::Acquire)
    }

    /// Frames pulled by render streams.
    pub fn rendered_frames(&self) -> u64 {
        self.rendered_frames.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| {
            error!("Simulated platform lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    fn notify(&self, event: PlatformEvent) {
        let _ = self.events.send(event);
    }

    fn notify_route_change(&self) {
        if self.lock().route_notifications {
            self.notify(PlatformEvent::RouteChanged);
        }
    }

    fn register_stream(&self, on_error: StreamErrorSink) -> u64 {
        let mut state = self.lock();
        let id = state.next_stream_id;
        state.next_stream_id += 1;
        state.error_sinks.insert(id, Arc::new(Mutex::new(on_error)));
        id
    }

    fn routed_input(state: &SimState) -> AudioDevice {
        let builtin = state.devices.built_in_input.clone();
        let Some(session) = state.session.as_ref() else {
            return builtin;
        };

        if let Some(preferred) = session.preferred_input.as_ref() {
            let attached = preferred.id == builtin.id
                || state.bluetooth_inputs.iter().any(|d| d.id == preferred.id);
            // A Bluetooth microphone only carries audio once SCO is up.
            if attached && (!preferred.kind.is_bluetooth() || state.sco_on) {
                return preferred.clone();
            }
        }

        if !session.force_built_in && session.allow_bluetooth && state.sco_on {
            if let Some(bt) = state.bluetooth_inputs.first() {
                return bt.clone();
            }
        }

        builtin
    }

    fn routed_output(state: &SimState) -> AudioDevice {
        let builtin = state.devices.built_in_output.clone();
        let session = state.session.as_ref();

        if let Some(preferred) = session.and_then(|s| s.preferred_output.as_ref()) {
            if preferred.id == builtin.id
                || state.bluetooth_outputs.iter().any(|d| d.id == preferred.id)
            {
                return preferred.clone();
            }
        }

        let bluetooth_allowed = session.is_none_or(|s| s.allow_bluetooth && !s.force_built_in);
        if bluetooth_allowed {
            if let Some(bt) = state.bluetooth_outputs.first() {
                return bt.clone();
            }
        }

        builtin
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlatform for SimulatedPlatform {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn check_permission(&self, permission: Permission) -> bool {
        !self.lock().denied.contains(&permission)
    }

    #[track_caller]
    fn snapshot(&self) -> PlatformResult<RouteSnapshot> {
        let state = self.lock();
        if state.fail_enumeration {
            return Err(PlatformError::Enumeration {
                reason: "simulated enumeration failure".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut available_inputs = vec![state.devices.built_in_input.clone()];
        available_inputs.extend(state.bluetooth_inputs.iter().cloned());
        let mut available_outputs = vec![state.devices.built_in_output.clone()];
        available_outputs.extend(state.bluetooth_outputs.iter().cloned());

        Ok(RouteSnapshot {
            routed_inputs: vec![Self::routed_input(&state)],
            routed_outputs: vec![Self::routed_output(&state)],
            available_inputs,
            available_outputs,
            sco_on: state.sco_on,
            sample_rate: if state.sco_on {
                SCO_SAMPLE_RATE
            } else {
                state.hardware_rate
            },
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.events.subscribe()
    }

    #[track_caller]
    fn apply_session(&self, config: &SessionConfig) -> PlatformResult<()> {
        {
            let mut state = self.lock();
            if state.fail_session {
                return Err(PlatformError::Session {
                    reason: "simulated session activation failure".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            state.session = Some(config.clone());
            state.session_activations += 1;
        }
        debug!(category = ?config.category, mode = ?config.mode, "Simulated session applied");
        self.notify_route_change();
        Ok(())
    }

    fn deactivate_session(&self) -> PlatformResult<()> {
        self.lock().session = None;
        self.notify_route_change();
        Ok(())
    }

    fn set_communication_mode(&self, enabled: bool) -> PlatformResult<()> {
        self.lock().communication_mode = enabled;
        Ok(())
    }

    #[track_caller]
    fn request_sco(&self, connect: bool) -> PlatformResult<()> {
        if connect && self.lock().fail_sco {
            return Err(PlatformError::Session {
                reason: "simulated SCO request failure".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if !connect {
            let was_on = {
                let mut state = self.lock();
                state.sco_requested = false;
                std::mem::replace(&mut state.sco_on, false)
            };
            if was_on {
                self.notify(PlatformEvent::ScoDisconnected);
                self.notify_route_change();
            }
            return Ok(());
        }

        let latency = {
            let mut state = self.lock();
            state.sco_requested = true;
            if state.bluetooth_inputs.is_empty() {
                None
            } else {
                state.sco_latency
            }
        };

        let Some(latency) = latency else {
            debug!("SCO requested but will never connect");
            return Ok(());
        };

        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        std::thread::spawn(move || {
            std::thread::sleep(latency);
            let (connected, notify_route) = {
                let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                if state.sco_requested && !state.bluetooth_inputs.is_empty() {
                    state.sco_on = true;
                    (true, state.route_notifications)
                } else {
                    (false, false)
                }
            };
            if connected {
                let _ = events.send(PlatformEvent::ScoConnected);
                if notify_route {
                    let _ = events.send(PlatformEvent::RouteChanged);
                }
            }
        });

        Ok(())
    }

    #[track_caller]
    fn open_capture(
        &self,
        device: Option<&AudioDevice>,
        _preferred_sample_rate: u32,
        mut sink: CaptureSink,
        on_error: StreamErrorSink,
    ) -> PlatformResult<Box<dyn AudioStream>> {
        let format = {
            let state = self.lock();
            let device = match device {
                Some(d) => d.clone(),
                None => Self::routed_input(&state),
            };
            let attached = device.id == state.devices.built_in_input.id
                || state.bluetooth_inputs.iter().any(|d| d.id == device.id);
            if !attached {
                return Err(PlatformError::DeviceNotFound {
                    reason: device.display_name,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            if device.kind.is_bluetooth() {
                StreamFormat {
                    sample_rate: SCO_SAMPLE_RATE,
                    channels: 1,
                }
            } else {
                state.capture_format
            }
        };

        let frames_per_block =
            (u64::from(format.sample_rate) * self.block.as_micros() as u64 / 1_000_000) as usize;
        let channels = usize::from(format.channels);
        let counter = Arc::clone(&self.captured_frames);
        let mut phase = 0.0f32;
        let step = TAU * 440.0 / format.sample_rate as f32;

        let worker = SimWorker::spawn(self.block, move || {
            let mut block = Vec::with_capacity(frames_per_block * channels);
            for _ in 0..frames_per_block {
                let sample = 0.25 * phase.sin();
                phase = (phase + step) % TAU;
                block.extend(std::iter::repeat_n(sample, channels));
            }
            sink(&block);
            counter.fetch_add(frames_per_block as u64, Ordering::AcqRel);
        });

        let id = self.register_stream(on_error);
        Ok(Box::new(SimStream {
            format,
            worker,
            id,
            state: Arc::clone(&self.state),
        }))
    }

    fn open_render(
        &self,
        _device: Option<&AudioDevice>,
        _requested: StreamFormat,
        mut source: RenderSource,
        on_error: StreamErrorSink,
    ) -> PlatformResult<Box<dyn AudioStream>> {
        let format = self.lock().render_format;
        let frames_per_block =
            (u64::from(format.sample_rate) * self.block.as_micros() as u64 / 1_000_000) as usize;
        let channels = usize::from(format.channels);
        let counter = Arc::clone(&self.rendered_frames);

        let worker = SimWorker::spawn(self.block, move || {
            let mut block = vec![0.0f32; frames_per_block * channels];
            source(&mut block);
            counter.fetch_add(frames_per_block as u64, Ordering::AcqRel);
        });

        let id = self.register_stream(on_error);
        Ok(Box::new(SimStream {
            format,
            worker,
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

/// Real-time clock thread driving a simulated stream.
struct SimWorker {
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimWorker {
    fn spawn<F>(block: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_running = Arc::clone(&running);
        let thread_shutdown = Arc::clone(&shutdown);

        let handle = std::thread::spawn(move || {
            while !thread_shutdown.load(Ordering::Acquire) {
                if thread_running.load(Ordering::Acquire) {
                    tick();
                }
                std::thread::sleep(block);
            }
        });

        Self {
            running,
            shutdown,
            handle: Some(handle),
        }
    }
}

struct SimStream {
    format: StreamFormat,
    worker: SimWorker,
    id: u64,
    state: Arc<Mutex<SimState>>,
}

impl AudioStream for SimStream {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn start(&mut self) -> PlatformResult<()> {
        self.worker.running.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&mut self) -> PlatformResult<()> {
        self.worker.running.store(false, Ordering::Release);
        Ok(())
    }

    fn stop(&mut self) -> PlatformResult<()> {
        self.worker.running.store(false, Ordering::Release);
        self.worker.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.worker.handle.take() {
            // Joining guarantees no tick runs after stop returns.
            let _ = handle.join();
        }
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .error_sinks
            .remove(&self.id);
        Ok(())
    }
}

impl Drop for SimStream {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
