//! Observer registry
//!
//! Callbacks are invoked synchronously, in registration order, with the
//! registry lock released. A panicking callback is logged and skipped; it
//! never prevents delivery to the others and never reaches the notifier.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, warn};

use inkloc_core::domain::LocationUpdate;

/// Observer callback
pub type Listener = Arc<dyn Fn(&LocationUpdate) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

/// Holds the registered location observers
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener
    ///
    /// If `current` is given it is delivered to this listener immediately,
    /// before `subscribe` returns.
    pub fn subscribe(&self, listener: Listener, current: Option<LocationUpdate>) -> Subscription {
        let id = {
            let mut registry = lock(&self.inner);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.insert(id, listener.clone());
            id
        };
        debug!(id, "Listener subscribed");

        if let Some(update) = current {
            invoke(id, &listener, &update);
        }

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers `update` to every listener, returning how many returned normally
    pub fn notify(&self, update: &LocationUpdate) -> usize {
        let snapshot: Vec<(u64, Listener)> = lock(&self.inner)
            .listeners
            .iter()
            .map(|(id, l)| (*id, l.clone()))
            .collect();

        snapshot
            .iter()
            .filter(|(id, listener)| invoke(*id, listener, update))
            .count()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Listeners run outside the lock, so a poisoned registry is still consistent.
fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn invoke(id: u64, listener: &Listener, update: &LocationUpdate) -> bool {
    match catch_unwind(AssertUnwindSafe(|| listener(update))) {
        Ok(()) => true,
        Err(_) => {
            warn!(id, "Location listener panicked; continuing with the rest");
            false
        }
    }
}

/// Handle returned by [`ObserverRegistry::subscribe`]
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Removes the listener; returns false if it was already gone
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let removed = lock(&registry).listeners.remove(&self.id).is_some();
        debug!(id = self.id, removed, "Listener unsubscribed");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkloc_core::domain::{LocationResult, LocationSource};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn resolved(city: &str) -> LocationUpdate {
        LocationUpdate::Resolved(LocationResult::new(city, "MD", "US", LocationSource::Ip))
    }

    fn counter() -> (Arc<AtomicUsize>, Listener) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (
            count,
            Arc::new(move |_: &LocationUpdate| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_immediate_delivery_on_subscribe() {
        let registry = ObserverRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = registry.subscribe(
            Arc::new(move |u: &LocationUpdate| {
                s.lock().unwrap().push(u.clone());
            }),
            Some(resolved("Laurel")),
        );
        assert_eq!(seen.lock().unwrap().as_slice(), &[resolved("Laurel")]);
    }

    #[test]
    fn test_no_delivery_without_current() {
        let registry = ObserverRegistry::new();
        let (count, listener) = counter();
        let _sub = registry.subscribe(listener, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry = ObserverRegistry::new();
        let _bad = registry.subscribe(Arc::new(|_: &LocationUpdate| panic!("listener bug")), None);
        let (count, listener) = counter();
        let _good = registry.subscribe(listener, None);

        let delivered = registry.notify(&resolved("Columbia"));
        assert_eq!(delivered, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let registry = ObserverRegistry::new();
        let (count, listener) = counter();
        let sub = registry.subscribe(listener, None);
        registry.notify(&resolved("Laurel"));
        assert!(sub.unsubscribe());
        registry.notify(&resolved("Columbia"));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_listener_may_subscribe_reentrantly() {
        let registry = ObserverRegistry::new();
        let inner = registry.clone();
        let _sub = registry.subscribe(
            Arc::new(move |_: &LocationUpdate| {
                let _ = inner.subscribe(Arc::new(|_: &LocationUpdate| {}), None);
            }),
            None,
        );
        registry.notify(&resolved("Laurel"));
        assert_eq!(registry.len(), 2);
    }
}
