//! Observable route state shared by the client router and the view binding.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::hydration::HydrationPayload;

/// The route currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteState {
    pub href: String,
    pub payload: HydrationPayload,
}

type Listener = Arc<dyn Fn(&RouteState) + Send + Sync>;

#[derive(Default)]
struct Inner {
    state: Option<RouteState>,
    listeners: BTreeMap<u64, Listener>,
    next_id: u64,
}

/// Explicit observer store. Cloning shares the same state.
#[derive(Clone, Default)]
pub struct RouteStore {
    inner: Arc<Mutex<Inner>>,
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<RouteState> {
        self.lock().state.clone()
    }

    /// Replace the state and notify every subscriber.
    ///
    /// Listeners run outside the lock, so they may read the store or
    /// subscribe without deadlocking.
    pub fn set(&self, state: RouteState) {
        let listeners: Vec<Listener> = {
            let mut inner = self.lock();
            inner.state = Some(state.clone());
            inner.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener(&state);
        }
    }

    /// Register a listener. It stays registered until the guard is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RouteState) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(id, Arc::new(listener));
        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for RouteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("RouteStore")
            .field("state", &inner.state)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

/// Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    store: Weak<Mutex<Inner>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.listeners.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Params;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn state(href: &str) -> RouteState {
        RouteState {
            href: href.into(),
            payload: HydrationPayload {
                props: serde_json::Value::Null,
                layout_ids: Vec::new(),
                page_id: "page.html".into(),
                params: Params::new(),
                metadata: None,
                error_id: None,
                loading_id: None,
            },
        }
    }

    #[test]
    fn test_subscribers_are_notified_until_dropped() {
        let store = RouteStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let subscription = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        store.set(state("/a"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(store.subscriber_count(), 0);
        store.set(state("/b"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get().unwrap().href, "/b");
    }

    #[test]
    fn test_listener_may_read_store() {
        let store = RouteStore::new();
        let seen = Arc::new(Mutex::new(None));
        let reader = store.clone();
        let sink = seen.clone();
        let _subscription = store.subscribe(move |_| {
            *sink.lock().unwrap() = reader.get().map(|s| s.href);
        });
        store.set(state("/x"));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("/x"));
    }

    #[test]
    fn test_subscription_outliving_store_is_harmless() {
        let store = RouteStore::new();
        let subscription = store.subscribe(|_| {});
        drop(store);
        drop(subscription);
    }
}
