use std::sync::Arc;

use tokio::sync::watch;

/// Point-in-time view of the interruption state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterruptionSnapshot {
    /// The OS currently owns the audio device.
    pub is_interrupted: bool,
    /// Something was paused by the interruption and awaits a confirmed resume.
    pub should_resume_after_interruption: bool,
}

/// Shared interruption flags.
///
/// Readable by anyone holding a clone; only the
/// [`InterruptionCoordinator`](super::InterruptionCoordinator) mutates it.
#[derive(Debug, Clone)]
pub struct InterruptionState {
    tx: Arc<watch::Sender<InterruptionSnapshot>>,
}

impl InterruptionState {
    /// Normal, uninterrupted state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(InterruptionSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Current flags.
    pub fn snapshot(&self) -> InterruptionSnapshot {
        *self.tx.borrow()
    }

    /// The OS currently owns the audio device.
    pub fn is_interrupted(&self) -> bool {
        self.tx.borrow().is_interrupted
    }

    /// Wait until no interruption is in progress.
    pub async fn wait_until_clear(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|s| !s.is_interrupted).await;
    }

    pub(super) fn set_interrupted(&self, interrupted: bool) {
        self.tx.send_modify(|s| s.is_interrupted = interrupted);
    }

    pub(super) fn set_should_resume(&self, should_resume: bool) {
        self.tx
            .send_modify(|s| s.should_resume_after_interruption = should_resume);
    }
}

impl Default for InterruptionState {
    fn default() -> Self {
        Self::new()
    }
}
