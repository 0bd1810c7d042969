//! Change-notification support shared by the synchronizer and the favorites
//! registry.
//!
//! Listeners are invoked synchronously, in registration order, and always
//! receive the full new value, never a diff. Notification happens outside
//! the listener lock so a callback may subscribe or unsubscribe reentrantly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Handle returned by `subscribe`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// An ordered set of change listeners.
pub struct Subscribers<A: ?Sized> {
    listeners: Mutex<Vec<(u64, Callback<A>)>>,
    next_id: AtomicU64,
}

impl<A: ?Sized> Subscribers<A> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener; it stays active until `unsubscribe` is called
    /// with the returned id.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().unwrap().push((id, Arc::new(listener)));
        ListenerId(id)
    }

    /// Remove a listener. Returns false if the id was already removed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id.0);
        listeners.len() != before
    }

    /// Call every listener with `value`, in registration order.
    pub fn notify(&self, value: &A) {
        let snapshot: Vec<Callback<A>> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in snapshot {
            callback(value);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

impl<A: ?Sized> Default for Subscribers<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_runs_in_registration_order() {
        let subscribers: Subscribers<u32> = Subscribers::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            subscribers.subscribe(move |value: &u32| {
                order.lock().unwrap().push((tag, *value));
            });
        }

        subscribers.notify(&7);
        let seen = order.lock().unwrap().clone();
        assert_eq!(seen, vec![("first", 7), ("second", 7), ("third", 7)]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let subscribers: Subscribers<u32> = Subscribers::new();
        let count = Arc::new(Mutex::new(0));

        let counted = Arc::clone(&count);
        let id = subscribers.subscribe(move |_| *counted.lock().unwrap() += 1);

        subscribers.notify(&1);
        assert!(subscribers.unsubscribe(id));
        subscribers.notify(&2);

        assert_eq!(*count.lock().unwrap(), 1);
        // A second unsubscribe with the same id is a no-op
        assert!(!subscribers.unsubscribe(id));
    }

    #[test]
    fn test_listener_may_unsubscribe_itself_during_notify() {
        let subscribers: Arc<Subscribers<u32>> = Arc::new(Subscribers::new());
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

        let inner = Arc::clone(&subscribers);
        let held = Arc::clone(&slot);
        let id = subscribers.subscribe(move |_| {
            if let Some(id) = held.lock().unwrap().take() {
                inner.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        subscribers.notify(&1);
        assert_eq!(subscribers.len(), 0);
    }
}
