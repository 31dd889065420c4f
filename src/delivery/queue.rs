//! Ordered, de-duplicating fan-out of notification records.
//!
//! # Delivery Semantics
//!
//! - Records reach subscribers in push order
//! - A record whose ID is still in the dedup window is dropped
//! - Each record goes to the subscriber set as it was when delivery of that
//!   record began: a subscriber added from inside a callback first sees the
//!   next record, and one removed from inside a callback still receives the
//!   current one
//! - A panicking subscriber is logged and skipped; the others still run

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::error::Error;
use crate::identifiers::SubscriptionId;
use crate::protocol::NotificationRecord;

use super::dedup::DedupWindow;

// ============================================================================
// Types
// ============================================================================

/// Subscriber callback.
pub type Subscriber = Arc<dyn Fn(&NotificationRecord) + Send + Sync>;

/// Registered subscribers in registration order.
type SubscriberList = Vec<(SubscriptionId, Subscriber)>;

// ============================================================================
// Subscribers
// ============================================================================

/// Shared subscriber registry.
///
/// Cloning shares the registry, so callers can subscribe without going
/// through the task that owns the [`DeliveryQueue`].
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Arc<Mutex<SubscriberList>>,
}

impl Subscribers {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&NotificationRecord) + Send + Sync + 'static,
    {
        let id = SubscriptionId::generate();
        self.inner.lock().push((id, Arc::new(callback)));
        trace!(subscription = %id, "Subscriber added");
        id
    }

    /// Removes a callback. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut list = self.inner.lock();
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;

        if removed {
            trace!(subscription = %id, "Subscriber removed");
        }
        removed
    }

    /// Number of registered subscribers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if nobody is subscribed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Copies the current list so callbacks run without the lock held.
    fn snapshot(&self) -> SubscriberList {
        self.inner.lock().clone()
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// PushOutcome
// ============================================================================

/// Result of [`DeliveryQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Record handed to every subscriber in the snapshot.
    Delivered {
        /// Subscribers invoked.
        subscribers: usize,
        /// Subscribers that panicked.
        failed: usize,
    },
    /// Record ID already in the dedup window; nothing delivered.
    Duplicate,
}

// ============================================================================
// DeliveryStats
// ============================================================================

/// Counters kept by a [`DeliveryQueue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Records delivered (each counted once, regardless of subscriber count).
    pub delivered: u64,
    /// Records dropped as duplicates.
    pub duplicates_dropped: u64,
    /// Subscriber callbacks that panicked.
    pub subscriber_panics: u64,
}

// ============================================================================
// DeliveryQueue
// ============================================================================

/// De-duplicates records and delivers them to subscribers in order.
#[derive(Debug)]
pub struct DeliveryQueue {
    dedup: DedupWindow,
    subscribers: Subscribers,
    stats: DeliveryStats,
}

impl DeliveryQueue {
    /// Creates a queue with a dedup window of `dedup_window_size` IDs.
    #[must_use]
    pub fn new(dedup_window_size: usize) -> Self {
        Self::with_subscribers(dedup_window_size, Subscribers::new())
    }

    /// Creates a queue delivering to an existing registry.
    #[must_use]
    pub fn with_subscribers(dedup_window_size: usize, subscribers: Subscribers) -> Self {
        Self {
            dedup: DedupWindow::new(dedup_window_size),
            subscribers,
            stats: DeliveryStats::default(),
        }
    }

    /// Registers a callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&NotificationRecord) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Removes a callback. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Returns the shared subscriber registry.
    #[inline]
    #[must_use]
    pub fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }

    /// Returns the counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    /// De-duplicates `record` and delivers it.
    pub fn push(&mut self, record: NotificationRecord) -> PushOutcome {
        if !self.dedup.insert(record.id()) {
            self.stats.duplicates_dropped += 1;
            trace!(id = %record.id(), "Dropping duplicate notification");
            return PushOutcome::Duplicate;
        }

        let snapshot = self.subscribers.snapshot();
        let mut failed = 0;

        for (subscription, callback) in &snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(&record))) {
                failed += 1;
                let err = Error::SubscriberCallback {
                    subscription: *subscription,
                    message: panic_message(payload.as_ref()),
                };
                warn!(error = %err, id = %record.id(), "Subscriber callback panicked");
            }
        }

        self.stats.delivered += 1;
        self.stats.subscriber_panics += failed as u64;

        trace!(id = %record.id(), subscribers = snapshot.len(), "Notification delivered");

        PushOutcome::Delivered {
            subscribers: snapshot.len(),
            failed,
        }
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::with_subscribers(super::dedup::DEFAULT_DEDUP_WINDOW, Subscribers::new())
    }
}

/// Extracts the message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    fn record(id: &str) -> NotificationRecord {
        NotificationRecord::new(id, format!("message {id}"), json!({ "id": id }))
    }

    /// Subscribes a collector and returns the shared log.
    fn collect(queue: &DeliveryQueue) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        queue.subscribe(move |r| sink.lock().push(r.id().to_string()));
        log
    }

    #[test]
    fn test_redelivery_collapsed() {
        let mut queue = DeliveryQueue::new(16);
        let log = collect(&queue);

        for id in ["a", "b", "a", "c"] {
            queue.push(record(id));
        }

        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
        assert_eq!(queue.stats().duplicates_dropped, 1);
        assert_eq!(queue.stats().delivered, 3);
    }

    #[test]
    fn test_push_outcome() {
        let mut queue = DeliveryQueue::new(16);
        let _log = collect(&queue);

        assert_eq!(
            queue.push(record("x")),
            PushOutcome::Delivered {
                subscribers: 1,
                failed: 0
            }
        );
        assert_eq!(queue.push(record("x")), PushOutcome::Duplicate);
    }

    #[test]
    fn test_subscriber_added_during_delivery_sees_next_record() {
        let mut queue = DeliveryQueue::new(16);
        let late_log = Arc::new(Mutex::new(Vec::new()));

        let registry = queue.subscribers().clone();
        let late_sink = Arc::clone(&late_log);
        let added = Arc::new(Mutex::new(false));
        queue.subscribe(move |_| {
            let mut added = added.lock();
            if !*added {
                *added = true;
                let sink = Arc::clone(&late_sink);
                registry.subscribe(move |r| sink.lock().push(r.id().to_string()));
            }
        });

        queue.push(record("n"));
        queue.push(record("n+1"));

        assert_eq!(*late_log.lock(), vec!["n+1"]);
    }

    #[test]
    fn test_unsubscribed_stops_receiving() {
        let mut queue = DeliveryQueue::new(16);
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let id = queue.subscribe(move |r| sink.lock().push(r.id().to_string()));

        queue.push(record("1"));
        assert!(queue.unsubscribe(id));
        assert!(!queue.unsubscribe(id));
        queue.push(record("2"));

        assert_eq!(*log.lock(), vec!["1"]);
    }

    #[test]
    fn test_panicking_subscriber_isolated() {
        let mut queue = DeliveryQueue::new(16);
        queue.subscribe(|_| panic!("render failed"));
        let log = collect(&queue);

        let outcome = queue.push(record("a"));
        queue.push(record("b"));

        assert_eq!(
            outcome,
            PushOutcome::Delivered {
                subscribers: 2,
                failed: 1
            }
        );
        assert_eq!(*log.lock(), vec!["a", "b"]);
        assert_eq!(queue.stats().subscriber_panics, 2);
    }

    #[test]
    fn test_no_subscribers_still_dedups() {
        let mut queue = DeliveryQueue::default();
        assert!(matches!(
            queue.push(record("a")),
            PushOutcome::Delivered { subscribers: 0, .. }
        ));
        assert_eq!(queue.push(record("a")), PushOutcome::Duplicate);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    proptest! {
        #[test]
        fn prop_delivers_first_occurrences_in_order(ids in prop::collection::vec(0u8..12, 0..64)) {
            let mut queue = DeliveryQueue::new(64);
            let log = collect(&queue);

            let ids: Vec<String> = ids.iter().map(|n| n.to_string()).collect();
            for id in &ids {
                queue.push(record(id));
            }

            let mut expected: Vec<String> = Vec::new();
            for id in &ids {
                if !expected.contains(id) {
                    expected.push(id.clone());
                }
            }

            prop_assert_eq!(log.lock().clone(), expected);
        }
    }
}
