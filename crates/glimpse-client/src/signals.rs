//! Cross-component signal bus.
//!
//! Decouples "something changed that might affect unread counts" from "who
//! needs to know".  A broadcast carries the event name and nothing else;
//! listeners re-fetch whatever derived value they display, so the bus never
//! becomes a second source of truth that can go stale.
//!
//! Dispatch is synchronous and fire-and-forget: no persistence, no ordering
//! guarantee across event names, no retry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Typed event names carried by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Unread badge counts may have changed; re-fetch them.
    RefreshNotifications,
}

impl Signal {
    /// The well-known wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::RefreshNotifications => "refreshNotifications",
        }
    }
}

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: HashMap<Signal, Vec<(u64, Handler)>>,
}

/// The bus handle.  Cheap to clone; clones share the listener table.
#[derive(Clone, Default)]
pub struct SignalBus {
    inner: Arc<Mutex<BusInner>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `signal`.
    ///
    /// Registration lives as long as the returned [`Subscription`]: the
    /// handler keeps firing until the subscription is dropped (or
    /// [`Subscription::unsubscribe`] is called), so a listener must hold it
    /// for exactly its visible lifetime.
    #[must_use = "dropping the subscription immediately deregisters the handler"]
    pub fn subscribe(&self, signal: Signal, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .listeners
            .entry(signal)
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            bus: Arc::downgrade(&self.inner),
            signal,
            id,
        }
    }

    /// Synchronously invoke every handler currently registered for
    /// `signal`.  Fire-and-forget; there is nothing to await and no result.
    pub fn broadcast(&self, signal: Signal) {
        // Snapshot the handlers so one may subscribe/unsubscribe re-entrantly
        // without deadlocking on the table.
        let handlers: Vec<Handler> = {
            let inner = self.lock();
            inner
                .listeners
                .get(&signal)
                .map(|entries| entries.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };

        tracing::debug!(event = signal.as_str(), listeners = handlers.len(), "broadcast");

        for handler in handlers {
            handler();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Scoped registration handle returned by [`SignalBus::subscribe`].
///
/// Dropping it deregisters the handler.
pub struct Subscription {
    bus: Weak<Mutex<BusInner>>,
    signal: Signal,
    id: u64,
}

impl Subscription {
    /// Explicitly release the registration.  Equivalent to dropping.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.bus.upgrade() else {
            return;
        };
        let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entries) = inner.listeners.get_mut(&self.signal) {
            entries.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn each_subscriber_fires_exactly_once_per_broadcast() {
        let bus = SignalBus::new();

        let sidebar = Arc::new(AtomicUsize::new(0));
        let top_nav = Arc::new(AtomicUsize::new(0));

        let _sub_a = {
            let count = sidebar.clone();
            bus.subscribe(Signal::RefreshNotifications, move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        let _sub_b = {
            let count = top_nav.clone();
            bus.subscribe(Signal::RefreshNotifications, move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        bus.broadcast(Signal::RefreshNotifications);

        assert_eq!(sidebar.load(Ordering::SeqCst), 1);
        assert_eq!(top_nav.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_subscription_stops_firing() {
        let bus = SignalBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let sub = {
            let count = count.clone();
            bus.subscribe(Signal::RefreshNotifications, move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        bus.broadcast(Signal::RefreshNotifications);
        sub.unsubscribe();
        bus.broadcast(Signal::RefreshNotifications);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn event_names_are_stable() {
        // Listeners key off this string; it must not drift.
        assert_eq!(Signal::RefreshNotifications.as_str(), "refreshNotifications");
    }

    #[test]
    fn broadcast_with_no_listeners_is_a_no_op() {
        let bus = SignalBus::new();
        bus.broadcast(Signal::RefreshNotifications);
    }
}
