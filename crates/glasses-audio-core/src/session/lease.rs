use crate::model::{AudioDevice, RouteWarning, SourcePreference};

/// What a lease holder will do with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPurpose {
    /// Capture (and possibly render).
    Recording,
    /// Render only.
    Playback,
}

/// Proof that the platform session is configured for its holder.
///
/// Returned by [`AudioSessionController::acquire`](super::AudioSessionController::acquire)
/// and handed back to `release` exactly once; the session is torn down when
/// the last lease goes back.
#[derive(Debug)]
pub struct SessionLease {
    pub(crate) id: u64,
    /// What the session was acquired for.
    pub purpose: SessionPurpose,
    /// Preference the holder asked for.
    pub preference: SourcePreference,
    /// Capture endpoint routed when the lease was granted.
    pub input: Option<AudioDevice>,
    /// Render endpoint routed when the lease was granted.
    pub output: Option<AudioDevice>,
    /// Set when the preference could not be honoured.
    pub warning: Option<RouteWarning>,
}

impl SessionLease {
    /// The SCO voice path (or another Bluetooth input) feeds capture.
    pub fn uses_bluetooth_input(&self) -> bool {
        self.input.as_ref().is_some_and(|d| d.kind.is_bluetooth())
    }
}
