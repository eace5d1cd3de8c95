//! # Subscription
//!
//! Receiving end of a hub registration.

use std::sync::Weak;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use uuid::Uuid;

use super::hub::HubShared;

/// A live registration for "store updated" notifications.
///
/// Closing (explicitly or by drop) removes it from its hub.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::Receiver<()>,
    hub: Weak<HubShared>,
    closed: bool,
}

impl Subscription {
    pub(super) fn new(id: Uuid, receiver: mpsc::Receiver<()>, hub: Weak<HubShared>) -> Self {
        Self {
            id,
            receiver,
            hub,
            closed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next change.
    ///
    /// Returns `false` once the subscription or its hub is closed.
    pub async fn changed(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.receiver.recv().await.is_some()
    }

    /// Non-blocking poll: `Some(true)` on a pending change, `None` when
    /// nothing is pending, `Some(false)` once closed.
    pub fn try_changed(&mut self) -> Option<bool> {
        if self.closed {
            return Some(false);
        }
        match self.receiver.try_recv() {
            Ok(()) => Some(true),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(false),
        }
    }

    /// Blocking wait for non-async callers.
    ///
    /// Must not be called from inside an async runtime.
    pub fn blocking_changed(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.receiver.blocking_recv().is_some()
    }

    /// Close the subscription. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(&self.id);
        }
        self.receiver.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
