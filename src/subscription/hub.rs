//! # Subscription Hub
//!
//! Fan-out of "the store changed" to every live subscription.
//!
//! Each subscription owns a capacity-1 channel. A notification that finds the
//! slot already full is coalesced with the pending one, so a slow consumer
//! learns that something changed, never how many times.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use super::subscription::Subscription;
use crate::observability::{log_event, Event, MetricsRegistry};

#[derive(Debug, Default)]
pub(super) struct HubShared {
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<()>>>,
    closed: AtomicBool,
}

impl HubShared {
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<()>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(super) fn remove(&self, id: &Uuid) {
        self.lock().remove(id);
    }
}

/// Update notifier shared by a store and its observers
#[derive(Debug, Clone)]
pub struct SubscriptionHub {
    shared: Arc<HubShared>,
    metrics: Arc<MetricsRegistry>,
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new(Arc::new(MetricsRegistry::new()))
    }
}

impl SubscriptionHub {
    /// Create a hub that reports into `metrics`
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            shared: Arc::new(HubShared::default()),
            metrics,
        }
    }

    /// Register a new subscription.
    ///
    /// After `close()` the returned subscription is already closed.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(1);
        let id = Uuid::new_v4();

        let mut subscribers = self.shared.lock();
        if !self.shared.closed.load(Ordering::Acquire) {
            subscribers.insert(id, tx);
        }
        drop(subscribers);

        Subscription::new(id, rx, Arc::downgrade(&self.shared))
    }

    /// Signal every subscription without blocking
    pub fn notify(&self) -> NotifyResult {
        let mut result = NotifyResult::default();
        let mut subscribers = self.shared.lock();

        subscribers.retain(|id, sender| match sender.try_send(()) {
            Ok(()) => {
                result.delivered += 1;
                true
            }
            Err(TrySendError::Full(())) => {
                result.coalesced += 1;
                log_event(Event::SubscriptionCoalesced, &[("subscription", &id.to_string())]);
                true
            }
            Err(TrySendError::Closed(())) => {
                result.pruned += 1;
                false
            }
        });
        drop(subscribers);

        for _ in 0..result.delivered {
            self.metrics.increment_notifications_sent();
        }
        for _ in 0..result.coalesced {
            self.metrics.increment_notifications_coalesced();
        }
        result
    }

    /// Close the hub and every subscription. Idempotent.
    pub fn close(&self) {
        let mut subscribers = self.shared.lock();
        self.shared.closed.store(true, Ordering::Release);
        subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().len()
    }
}

/// Outcome of one `notify()` call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotifyResult {
    /// Subscriptions that received a fresh notification
    pub delivered: usize,
    /// Subscriptions that already had one pending
    pub coalesced: usize,
    /// Subscriptions found closed and removed
    pub pruned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_delivers_once_then_coalesces() {
        let hub = SubscriptionHub::default();
        let mut sub = hub.subscribe();

        assert_eq!(hub.notify().delivered, 1);
        assert_eq!(hub.notify().coalesced, 1);
        assert_eq!(hub.notify().coalesced, 1);

        assert_eq!(sub.try_changed(), Some(true));
        assert_eq!(sub.try_changed(), None);
    }

    #[test]
    fn test_fan_out() {
        let hub = SubscriptionHub::default();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        let result = hub.notify();
        assert_eq!(result.delivered, 2);
        assert_eq!(a.try_changed(), Some(true));
        assert_eq!(b.try_changed(), Some(true));
    }

    #[test]
    fn test_close_propagates() {
        let hub = SubscriptionHub::default();
        let mut sub = hub.subscribe();
        hub.close();
        hub.close();
        assert!(hub.is_closed());
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(sub.try_changed(), Some(false));
    }

    #[test]
    fn test_pending_notification_survives_close() {
        let hub = SubscriptionHub::default();
        let mut sub = hub.subscribe();
        hub.notify();
        hub.close();
        assert_eq!(sub.try_changed(), Some(true));
        assert_eq!(sub.try_changed(), Some(false));
    }

    #[test]
    fn test_subscribe_after_close() {
        let hub = SubscriptionHub::default();
        hub.close();
        let mut sub = hub.subscribe();
        assert_eq!(sub.try_changed(), Some(false));
        assert_eq!(hub.notify(), NotifyResult::default());
    }

    #[test]
    fn test_dropped_subscription_is_removed() {
        let hub = SubscriptionHub::default();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.notify(), NotifyResult::default());
    }

    #[test]
    fn test_metrics_counted() {
        let metrics = Arc::new(MetricsRegistry::new());
        let hub = SubscriptionHub::new(metrics.clone());
        let _sub = hub.subscribe();
        hub.notify();
        hub.notify();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.notifications_sent, 1);
        assert_eq!(snapshot.notifications_coalesced, 1);
    }
}
