//! Write-once terminal result shared by every waiter of a session.

use crate::OperationFailure;

use tokio::sync::watch;

/// Sending half; only the first [`CompletionCell::complete`] lands.
#[derive(Debug)]
pub(crate) struct CompletionCell<T> {
    tx: watch::Sender<Option<T>>,
}

/// Receiving half, cloneable.
#[derive(Debug, Clone)]
pub struct Completion<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> CompletionCell<T> {
    pub(crate) fn new() -> (Self, Completion<T>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, Completion { rx })
    }

    /// Store `value` unless a result is already set. Returns whether it landed.
    pub(crate) fn complete(&self, value: T) -> bool {
        let mut value = Some(value);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take();
            true
        })
    }

    pub(crate) fn get(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> Completion<T> {
        Completion {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone> Completion<T> {
    /// Wait for the terminal result.
    ///
    /// Returns `None` only if the session was dropped without completing.
    pub async fn wait(&mut self) -> Option<T> {
        let ready = self.rx.wait_for(Option::is_some).await.map(|value| value.clone());
        match ready {
            Ok(value) => value,
            Err(_) => self.rx.borrow().clone(),
        }
    }

    /// Result if already available.
    pub fn peek(&self) -> Option<T> {
        self.rx.borrow().clone()
    }
}

impl<T: Clone> Completion<Result<T, OperationFailure>> {
    /// Wait for the terminal result; a session dropped without one is
    /// reported as [`OperationFailure::no_result`].
    pub async fn outcome(&mut self) -> Result<T, OperationFailure> {
        self.wait().await.unwrap_or_else(|| Err(OperationFailure::no_result()))
    }
}
