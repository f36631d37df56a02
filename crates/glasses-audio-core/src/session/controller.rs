use crate::{
    AudioError, CoreResult, EngineConfig, ErrorCode,
    model::{AudioRoute, RouteWarning, SourcePreference},
    platform::{AudioPlatform, PlatformEvent, SessionCategory, SessionConfig, run_blocking},
    route_monitor::RouteMonitor,
    session::{SessionLease, SessionPlan, SessionPurpose, plan_session, required_permissions},
};

use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio::sync::{Mutex, broadcast, broadcast::error::RecvError};
use tracing::{debug, info, instrument, warn};

const WARNING_CAPACITY: usize = 16;

struct ActiveSession {
    config: SessionConfig,
    preference: SourcePreference,
    sco: bool,
}

#[derive(Default)]
struct ControllerState {
    active: Option<ActiveSession>,
    leases: HashSet<u64>,
    next_lease: u64,
}

/// Sole owner of the process-wide platform audio session.
///
/// Recorder and Player never configure the platform themselves; they take a
/// [`SessionLease`] and give it back. The first lease configures the session
/// (including the SCO handshake), the last release tears it down.
pub struct AudioSessionController {
    platform: Arc<dyn AudioPlatform>,
    monitor: Arc<RouteMonitor>,
    settle_delay: Duration,
    sample_rate_hint: u32,
    state: Mutex<ControllerState>,
    warnings: broadcast::Sender<RouteWarning>,
}

impl AudioSessionController {
    /// Controller over `platform`, verifying devices through `monitor`.
    pub fn new(
        platform: Arc<dyn AudioPlatform>,
        monitor: Arc<RouteMonitor>,
        config: &EngineConfig,
    ) -> Self {
        let (warnings, _) = broadcast::channel(WARNING_CAPACITY);
        Self {
            platform,
            monitor,
            settle_delay: config.sco_settle_delay(),
            sample_rate_hint: config.target_sample_rate,
            state: Mutex::new(ControllerState::default()),
            warnings,
        }
    }

    /// Non-fatal routing fallbacks.
    pub fn on_warning(&self) -> broadcast::Receiver<RouteWarning> {
        self.warnings.subscribe()
    }

    /// Fail with `PermissionDenied` unless everything the operation needs is granted.
    #[track_caller]
    pub fn check_permissions(
        &self,
        preference: SourcePreference,
        purpose: SessionPurpose,
    ) -> CoreResult<()> {
        for permission in required_permissions(preference, purpose) {
            if !self.platform.check_permission(permission) {
                warn!(%permission, %preference, "Permission missing");
                return Err(AudioError::permission_denied(permission));
            }
        }
        Ok(())
    }

    /// Configure (or join) the platform session for `preference`.
    ///
    /// `GLASSES` without a usable Bluetooth device, or with an SCO link that
    /// does not confirm within the settle delay, proceeds on built-in
    /// hardware and reports a [`RouteWarning`] instead of failing.
    #[instrument(skip(self), fields(platform = self.platform.name()))]
    pub async fn acquire(
        &self,
        preference: SourcePreference,
        purpose: SessionPurpose,
    ) -> CoreResult<SessionLease> {
        self.check_permissions(preference, purpose)?;

        let mut state = self.state.lock().await;
        let mut warning = None;

        let reconfigure = match state.active.as_ref() {
            None => true,
            Some(active) => {
                active.config.category != SessionCategory::PlayAndRecord
                    && purpose == SessionPurpose::Recording
            }
        };

        if reconfigure {
            let previous_sco = state.active.as_ref().is_some_and(|a| a.sco);
            let route = self.refresh_route().await;
            let plan = plan_session(preference, purpose, &route, self.sample_rate_hint);
            if let Some(reason) = plan.fallback_reason.as_ref() {
                warning = Some(self.raise_warning(preference, reason.clone()));
            }

            let configured = self.configure(preference, purpose, plan, previous_sco).await;
            let (active, sco_warning) = match configured {
                Ok(done) => done,
                Err(e) => {
                    self.restore(state.active.as_ref()).await;
                    return Err(e);
                }
            };
            if sco_warning.is_some() {
                warning = sco_warning;
            }
            state.active = Some(active);
        } else if let Some(active) = state.active.as_ref() {
            if active.preference != preference {
                debug!(
                    active = %active.preference,
                    requested = %preference,
                    "Joining session configured for another preference"
                );
                if preference == SourcePreference::Glasses && !active.sco {
                    warning = Some(self.raise_warning(
                        preference,
                        format!("audio session already configured for {}", active.preference),
                    ));
                }
            }
        }

        let route = self.refresh_route().await;
        let id = state.next_lease;
        state.next_lease += 1;
        state.leases.insert(id);

        let lease = SessionLease {
            id,
            purpose,
            preference,
            input: match purpose {
                SessionPurpose::Recording => route.inputs.first().cloned(),
                SessionPurpose::Playback => None,
            },
            output: route.outputs.first().cloned(),
            warning,
        };

        info!(
            lease = id,
            %preference,
            input = ?lease.input.as_ref().map(|d| d.display_name.as_str()),
            output = ?lease.output.as_ref().map(|d| d.display_name.as_str()),
            "Audio session lease granted"
        );

        Ok(lease)
    }

    /// Return a lease; the session is torn down with the last one.
    ///
    /// Releasing a lease twice is impossible by construction; releasing after
    /// [`teardown`](Self::teardown) is a no-op.
    #[instrument(skip(self, lease), fields(lease = lease.id))]
    pub async fn release(&self, lease: SessionLease) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.leases.remove(&lease.id) {
            debug!("Lease already released by teardown");
            return Ok(());
        }
        if !state.leases.is_empty() {
            debug!(remaining = state.leases.len(), "Session still in use");
            return Ok(());
        }
        match state.active.take() {
            Some(active) => self.deactivate(active).await,
            None => Ok(()),
        }
    }

    /// Reverse every configuration step regardless of outstanding leases.
    #[instrument(skip(self))]
    pub async fn teardown(&self) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.leases.clear();
        match state.active.take() {
            Some(active) => self.deactivate(active).await,
            None => Ok(()),
        }
    }

    /// Re-apply the active configuration after an interruption.
    #[instrument(skip(self))]
    pub async fn reactivate(&self) -> CoreResult<()> {
        let state = self.state.lock().await;
        let Some(active) = state.active.as_ref() else {
            debug!("No active session to reactivate");
            return Ok(());
        };

        let config = active.config.clone();
        run_blocking(&self.platform, move |p| p.apply_session(&config))
            .await
            .map_err(AudioError::from_session)?;

        if active.sco && !self.handshake().await? {
            warn!("SCO did not reconnect after interruption");
        }

        info!(preference = %active.preference, "Audio session reactivated");
        Ok(())
    }

    /// A platform session is configured.
    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    /// Outstanding leases.
    pub async fn lease_count(&self) -> usize {
        self.state.lock().await.leases.len()
    }

    async fn configure(
        &self,
        preference: SourcePreference,
        purpose: SessionPurpose,
        plan: SessionPlan,
        previous_sco: bool,
    ) -> CoreResult<(ActiveSession, Option<RouteWarning>)> {
        if previous_sco && !plan.use_sco {
            self.sco_down().await?;
        }

        let config = plan.config.clone();
        run_blocking(&self.platform, move |p| p.apply_session(&config))
            .await
            .map_err(AudioError::from_session)?;
        debug!(mode = ?plan.config.mode, sco = plan.use_sco, "Session configuration applied");

        if !plan.use_sco || previous_sco {
            return Ok((
                ActiveSession {
                    config: plan.config,
                    preference,
                    sco: plan.use_sco,
                },
                None,
            ));
        }

        if self.handshake().await? {
            return Ok((
                ActiveSession {
                    config: plan.config,
                    preference,
                    sco: true,
                },
                None,
            ));
        }

        // SCO never confirmed: undo the voice path and continue on built-in hardware.
        self.sco_down().await?;
        let route = self.refresh_route().await;
        let fallback = plan_session(SourcePreference::Auto, purpose, &route, self.sample_rate_hint);
        let config = fallback.config.clone();
        run_blocking(&self.platform, move |p| p.apply_session(&config))
            .await
            .map_err(AudioError::from_session)?;

        let warning = self.raise_warning(
            preference,
            format!(
                "Bluetooth voice link not confirmed within {} ms, using built-in hardware",
                self.settle_delay.as_millis()
            ),
        );

        Ok((
            ActiveSession {
                config: fallback.config,
                preference,
                sco: false,
            },
            Some(warning),
        ))
    }

    /// Undo a failed configuration: re-apply the previous session, or leave
    /// nothing configured when there was none. The caller reports the
    /// original error; rollback failures are only logged.
    async fn restore(&self, previous: Option<&ActiveSession>) {
        let result = match previous {
            Some(active) => {
                let config = active.config.clone();
                let sco = active.sco;
                run_blocking(&self.platform, move |p| {
                    p.apply_session(&config)?;
                    if !sco {
                        p.request_sco(false)?;
                        p.set_communication_mode(false)?;
                    }
                    Ok(())
                })
                .await
            }
            None => {
                run_blocking(&self.platform, |p| {
                    let mut first = p.deactivate_session().err();
                    if let Err(e) = p.request_sco(false) {
                        first.get_or_insert(e);
                    }
                    if let Err(e) = p.set_communication_mode(false) {
                        first.get_or_insert(e);
                    }
                    first.map_or(Ok(()), Err)
                })
                .await
            }
        };

        match result {
            Ok(()) => debug!(restored = previous.is_some(), "Failed configuration rolled back"),
            Err(e) => warn!(error = %e, "Rollback after failed configuration incomplete"),
        }
    }

    /// Communication mode, SCO request, then wait for the earliest of the
    /// connected event or the settle delay. Returns whether SCO is up.
    async fn handshake(&self) -> CoreResult<bool> {
        let mut events = self.platform.subscribe();

        run_blocking(&self.platform, |p| {
            p.set_communication_mode(true)?;
            p.request_sco(true)
        })
        .await
        .map_err(AudioError::from_session)?;

        let connected = tokio::time::timeout(self.settle_delay, async {
            loop {
                match events.recv().await {
                    Ok(PlatformEvent::ScoConnected) => return true,
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return false,
                }
            }
        })
        .await
        .unwrap_or(false);

        if connected {
            debug!("SCO connected event received");
            return Ok(true);
        }

        // The event may have raced the subscription; the flag is authoritative.
        let route = self.refresh_route().await;
        let up = route.is_sco_on || route.has_bluetooth_input();
        debug!(sco = up, settle_ms = self.settle_delay.as_millis() as u64, "SCO settle elapsed");
        Ok(up)
    }

    async fn sco_down(&self) -> CoreResult<()> {
        run_blocking(&self.platform, |p| {
            let disconnect = p.request_sco(false);
            let mode = p.set_communication_mode(false);
            disconnect.and(mode)
        })
        .await
        .map_err(AudioError::from_session)
    }

    /// Release the session, then tear down SCO. Every step runs.
    async fn deactivate(&self, active: ActiveSession) -> CoreResult<()> {
        let sco = active.sco;
        let result = run_blocking(&self.platform, move |p| {
            let mut first = p.deactivate_session().err();
            if sco {
                if let Err(e) = p.request_sco(false) {
                    first.get_or_insert(e);
                }
                if let Err(e) = p.set_communication_mode(false) {
                    first.get_or_insert(e);
                }
            }
            first.map_or(Ok(()), Err)
        })
        .await;

        match result {
            Ok(()) => {
                info!(preference = %active.preference, sco, "Audio session torn down");
                self.refresh_route().await;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Audio session teardown incomplete");
                Err(AudioError::from_session(e))
            }
        }
    }

    async fn refresh_route(&self) -> AudioRoute {
        let monitor = Arc::clone(&self.monitor);
        match tokio::task::spawn_blocking(move || monitor.refresh()).await {
            Ok(route) => route,
            Err(e) => {
                warn!(error = %e, "Route refresh task failed");
                self.monitor.current_route()
            }
        }
    }

    fn raise_warning(&self, preference: SourcePreference, message: String) -> RouteWarning {
        warn!(%preference, %message, "Routing fallback");
        let warning = RouteWarning {
            code: ErrorCode::DeviceUnavailable,
            requested: preference,
            message,
        };
        let _ = self.warnings.send(warning.clone());
        warning
    }
}
