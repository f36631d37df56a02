use crate::{
    model::AudioRoute,
    platform::{AudioPlatform, PlatformEvent, RouteSnapshot},
};

use std::{
    sync::{Arc, Mutex, MutexGuard, RwLock},
    time::{Duration, SystemTime},
};

use tokio::{
    sync::broadcast::error::RecvError,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, instrument, warn};

type RouteListener = Arc<dyn Fn(AudioRoute) + Send + Sync + 'static>;

struct MonitorState {
    current: AudioRoute,
    has_good_snapshot: bool,
    failing: bool,
}

/// Authoritative, pollable and event-driven view of hardware routing.
///
/// Native route notifications trigger an immediate re-enumeration and a
/// periodic poll catches anything the platform failed to report. Listeners
/// only hear about content changes; when enumeration fails the last good
/// route is re-emitted once and kept as the current route.
pub struct RouteMonitor {
    platform: Arc<dyn AudioPlatform>,
    poll_interval: Duration,
    state: RwLock<MonitorState>,
    listener: RwLock<Option<RouteListener>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RouteMonitor {
    /// Monitor over `platform`, polling every `poll_interval` once started.
    pub fn new(platform: Arc<dyn AudioPlatform>, poll_interval: Duration) -> Self {
        Self {
            platform,
            poll_interval,
            state: RwLock::new(MonitorState {
                current: AudioRoute::empty(),
                has_good_snapshot: false,
                failing: false,
            }),
            listener: RwLock::new(None),
            task: Mutex::new(None),
        }
    }

    /// Subscribe to route notifications, start polling and emit the current route.
    ///
    /// Restarting replaces the previous listener.
    #[instrument(skip(self, on_change), fields(platform = self.platform.name()))]
    pub fn start(self: &Arc<Self>, on_change: impl Fn(AudioRoute) + Send + Sync + 'static) {
        self.stop();

        // Subscribe before the first enumeration so no notification slips between.
        let mut events = self.platform.subscribe();
        *self.listener.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(on_change));

        let (route, emitted) = self.update();
        if !emitted {
            self.emit(route);
        }

        let monitor = Arc::clone(self);
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let handle = tokio::spawn(async move {
            // The first tick completes immediately; the initial route is already out.
            ticker.tick().await;
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(PlatformEvent::RouteChanged
                            | PlatformEvent::ScoConnected
                            | PlatformEvent::ScoDisconnected) => {
                            debug!("Route notification received");
                            monitor.refresh_blocking().await;
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Route notifications lagged, re-enumerating");
                            monitor.refresh_blocking().await;
                        }
                        Err(RecvError::Closed) => {
                            warn!("Route notifications closed, polling only");
                            loop {
                                ticker.tick().await;
                                monitor.refresh_blocking().await;
                            }
                        }
                    },
                    _ = ticker.tick() => {
                        monitor.refresh_blocking().await;
                    }
                }
            }
        });

        *self.task_slot() = Some(handle);
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "Route monitor started");
    }

    /// Unsubscribe and cancel the poll timer.
    pub fn stop(&self) {
        if let Some(handle) = self.task_slot().take() {
            handle.abort();
            info!("Route monitor stopped");
        }
        *self.listener.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Last known route. Never blocks on enumeration.
    pub fn current_route(&self) -> AudioRoute {
        self.read_state().current.clone()
    }

    /// Any Bluetooth endpoint is attached.
    pub fn is_bluetooth_connected(&self) -> bool {
        self.read_state().current.is_bluetooth_connected
    }

    /// Name of the attached Bluetooth device.
    pub fn bluetooth_device_name(&self) -> Option<String> {
        self.read_state()
            .current
            .bluetooth_device_name()
            .map(str::to_string)
    }

    /// Re-enumerate now, notifying the listener if anything changed.
    ///
    /// Blocks on the platform; call from a blocking context. Never fails:
    /// on enumeration failure the last good route is returned.
    pub fn refresh(&self) -> AudioRoute {
        self.update().0
    }

    fn update(&self) -> (AudioRoute, bool) {
        match self.platform.snapshot() {
            Ok(snapshot) => {
                let route = route_from(snapshot);
                let changed = {
                    let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                    let changed =
                        !state.has_good_snapshot || !state.current.same_hardware(&route);
                    state.current = route.clone();
                    state.has_good_snapshot = true;
                    state.failing = false;
                    changed
                };
                if changed {
                    info!(
                        bluetooth = route.is_bluetooth_connected,
                        sco = route.is_sco_on,
                        sample_rate = route.sample_rate,
                        "Audio route changed"
                    );
                    self.emit(route.clone());
                }
                (route, changed)
            }
            Err(e) => {
                let (route, first_failure) = {
                    let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                    let first_failure = !state.failing;
                    state.failing = true;
                    (state.current.clone(), first_failure)
                };
                if first_failure {
                    warn!(error = %e, "Route enumeration failed, keeping last good route");
                    self.emit(route.clone());
                }
                (route, first_failure)
            }
        }
    }

    async fn refresh_blocking(self: &Arc<Self>) {
        let monitor = Arc::clone(self);
        if let Err(e) = tokio::task::spawn_blocking(move || monitor.refresh()).await {
            warn!(error = %e, "Route refresh task failed");
        }
    }

    fn emit(&self, route: AudioRoute) {
        let listener = self
            .listener
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(listener) = listener {
            listener(route);
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, MonitorState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn task_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for RouteMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.task_slot().take() {
            handle.abort();
        }
    }
}

/// Classify a raw snapshot. Input and output Bluetooth presence are
/// independent: Bluetooth output with a built-in microphone is common.
pub(crate) fn route_from(snapshot: RouteSnapshot) -> AudioRoute {
    let is_bluetooth_connected = snapshot
        .available_inputs
        .iter()
        .chain(snapshot.available_outputs.iter())
        .chain(snapshot.routed_inputs.iter())
        .chain(snapshot.routed_outputs.iter())
        .any(|d| d.kind.is_bluetooth());

    AudioRoute {
        inputs: snapshot.routed_inputs,
        outputs: snapshot.routed_outputs,
        available_inputs: snapshot.available_inputs,
        available_outputs: snapshot.available_outputs,
        is_bluetooth_connected,
        is_sco_on: snapshot.sco_on,
        sample_rate: snapshot.sample_rate,
        timestamp: SystemTime::now(),
    }
}
