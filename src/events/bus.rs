//! # Event bus: typed subscription registry with acknowledgement-based removal.
//!
//! [`Bus`] maps an [`EventKind`] to the handlers subscribed to it. Publishing
//! invokes every matching handler; handlers registered as *once* are removed
//! as soon as they acknowledge an event by returning `true`.
//!
//! ## Architecture
//! ```text
//! Publishers (scheduler activities, task executions):
//!   publish(&Event) ──► snapshot matching subscriptions (lock released)
//!                       ──► invoke handlers, collect acknowledgements
//!                       ──► remove acknowledged once-subscriptions
//! ```
//!
//! ## Rules
//! - **Synchronous handlers**: a handler must not block; work that needs to
//!   await something hands the event off (e.g. through a oneshot channel).
//! - **Acknowledgement**: for a once-subscription, returning `true` means
//!   "satisfied, remove me". Returning `false` keeps it armed, which lets a
//!   single handler observe many events and decide per-invocation whether it
//!   is done (this is how waiting on one specific task id works).
//! - **Plain subscriptions** ignore the handler's return value; they are
//!   removed only through their [`Subscription`] handle or `unsubscribe`.
//! - **Isolation**: a panicking handler is caught and reported; it never
//!   poisons the registry or aborts the publisher.
//! - **Re-entrancy**: handlers run with no registry lock held, so they may
//!   subscribe and unsubscribe freely.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::event::{Event, EventKind};

/// Handler invoked per matching event; the `bool` is the once-acknowledgement.
type Handler<T> = Arc<dyn Fn(&Event<T>) -> bool + Send + Sync>;

/// Identity of one subscription within its bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry<T> {
    id: SubscriptionId,
    handler: Handler<T>,
    once: bool,
}

struct BusInner<T> {
    registry: Mutex<HashMap<EventKind, Vec<Entry<T>>>>,
    next_id: AtomicU64,
}

impl<T> BusInner<T> {
    // Handlers never run under this lock, so a poisoned guard can only mean a
    // panic between two plain collection operations; the map is still intact.
    fn registry(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<Entry<T>>>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        let Some(entries) = registry.get_mut(&kind) else {
            return false;
        };
        let Some(index) = entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        entries.remove(index);
        true
    }
}

/// Handle to one registered subscription.
///
/// Removing through the handle is idempotent: the first [`cancel`](Subscription::cancel)
/// removes the subscription and returns `true`; later calls return `false`.
/// Dropping the handle does **not** unsubscribe.
pub struct Subscription<T> {
    bus: Weak<BusInner<T>>,
    kind: EventKind,
    id: SubscriptionId,
}

impl<T> Subscription<T> {
    /// Returns the subscription's identity, usable with [`Bus::unsubscribe`].
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the event kind this subscription listens to.
    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Removes the subscription; returns whether it was still registered.
    pub fn cancel(&self) -> bool {
        match self.bus.upgrade() {
            Some(bus) => bus.remove(self.kind, self.id),
            None => false,
        }
    }
}

/// Typed event-subscription registry.
pub struct Bus<T> {
    inner: Arc<BusInner<T>>,
}

impl<T> Default for Bus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bus<T> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a handler for `kind`.
    ///
    /// With `once = true` the subscription is removed as soon as the handler
    /// acknowledges an event by returning `true`; with `once = false` the
    /// return value is ignored.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&Event<T>) -> bool + Send + Sync + 'static,
        once: bool,
    ) -> Subscription<T> {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        self.inner.registry().entry(kind).or_default().push(Entry {
            id,
            handler: Arc::new(handler),
            once,
        });
        Subscription {
            bus: Arc::downgrade(&self.inner),
            kind,
            id,
        }
    }

    /// Removes the subscription with the given identity; returns whether one was found.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.inner.remove(kind, id)
    }

    /// Publishes an event to every handler subscribed to its kind.
    ///
    /// Handlers are invoked outside the registry lock, in registration order.
    /// Acknowledged once-subscriptions are removed afterwards; subscriptions
    /// added or removed by a handler take effect for the next publish.
    pub fn publish(&self, event: &Event<T>) {
        let kind = event.kind();
        let snapshot: Vec<(SubscriptionId, Handler<T>, bool)> = {
            let registry = self.inner.registry();
            match registry.get(&kind) {
                Some(entries) => entries
                    .iter()
                    .map(|entry| (entry.id, Arc::clone(&entry.handler), entry.once))
                    .collect(),
                None => return,
            }
        };

        let mut satisfied = Vec::new();
        for (id, handler, once) in snapshot {
            let acked = match std::panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(acked) => acked,
                Err(_) => {
                    eprintln!("[jobvisor] event handler panicked on '{kind}' event");
                    false
                }
            };
            if once && acked {
                satisfied.push(id);
            }
        }

        if !satisfied.is_empty() {
            let mut registry = self.inner.registry();
            if let Some(entries) = registry.get_mut(&kind) {
                entries.retain(|entry| !satisfied.contains(&entry.id));
            }
        }
    }

    /// Drops every subscription (their pending handles become inert).
    pub fn clear(&self) {
        self.inner.registry().clear();
    }

    /// Number of live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.inner.registry().get(&kind).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn bus() -> Bus<u32> {
        Bus::new()
    }

    #[test]
    fn test_publish_reaches_matching_subscribers_only() {
        let bus = bus();
        let hits = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&hits);
        bus.subscribe(
            EventKind::Drained,
            move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                false
            },
            false,
        );

        bus.publish(&Event::drained());
        bus.publish(&Event::stats(Default::default()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_once_removed_only_on_acknowledgement() {
        let bus = bus();
        let hits = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&hits);
        bus.subscribe(
            EventKind::Drained,
            move |_| {
                // Acknowledge on the third delivery only.
                seen.fetch_add(1, Ordering::SeqCst) == 2
            },
            true,
        );

        for _ in 0..5 {
            bus.publish(&Event::drained());
        }
        // Delivered three times; removed after the acknowledged invocation.
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(bus.subscriber_count(EventKind::Drained), 0);
    }

    #[test]
    fn test_plain_subscription_ignores_return_value() {
        let bus = bus();
        bus.subscribe(EventKind::Drained, |_| true, false);

        bus.publish(&Event::drained());
        assert_eq!(bus.subscriber_count(EventKind::Drained), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let bus = bus();
        let sub = bus.subscribe(EventKind::Drained, |_| false, false);

        assert!(sub.cancel());
        assert!(!sub.cancel());
        assert_eq!(bus.subscriber_count(EventKind::Drained), 0);
    }

    #[test]
    fn test_unsubscribe_reports_whether_found() {
        let bus = bus();
        let sub = bus.subscribe(EventKind::JobDone, |_| false, false);

        assert!(bus.unsubscribe(EventKind::JobDone, sub.id()));
        assert!(!bus.unsubscribe(EventKind::JobDone, sub.id()));
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let bus = bus();
        let hits = Arc::new(AtomicUsize::new(0));

        bus.subscribe(
            EventKind::Drained,
            |_| panic!("handler exploded"),
            false,
        );
        let seen = Arc::clone(&hits);
        bus.subscribe(
            EventKind::Drained,
            move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                false
            },
            false,
        );

        bus.publish(&Event::drained());
        bus.publish(&Event::drained());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(bus.subscriber_count(EventKind::Drained), 2);
    }

    #[test]
    fn test_handler_may_resubscribe_during_publish() {
        let bus: Arc<Bus<u32>> = Arc::new(Bus::new());
        let reentrant = Arc::clone(&bus);

        bus.subscribe(
            EventKind::Drained,
            move |_| {
                reentrant.subscribe(EventKind::Stats, |_| false, false);
                true
            },
            true,
        );

        bus.publish(&Event::drained());
        assert_eq!(bus.subscriber_count(EventKind::Drained), 0);
        assert_eq!(bus.subscriber_count(EventKind::Stats), 1);
    }

    #[test]
    fn test_clear_makes_handles_inert() {
        let bus = bus();
        let sub = bus.subscribe(EventKind::Drained, |_| false, false);

        bus.clear();
        assert!(!sub.cancel());
        assert_eq!(bus.subscriber_count(EventKind::Drained), 0);
    }
}
