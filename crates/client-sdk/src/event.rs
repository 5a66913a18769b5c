//! Single-signal publish/subscribe.
//!
//! An [`EventChannel`] fans one value out to every subscribed handler,
//! synchronously and in subscription order.  The handler list is
//! copy-on-write: `emit` works on a snapshot, so handlers may subscribe or
//! unsubscribe while an emit is in flight and the change only applies to
//! later emits.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listener<T> {
    id: u64,
    handler: Handler<T>,
}

struct Listeners<T> {
    next_id: AtomicU64,
    list: Mutex<Arc<Vec<Listener<T>>>>,
}

/// Publish/subscribe channel for values of type `T`.
pub struct EventChannel<T> {
    shared: Arc<Listeners<T>>,
}

impl<T: 'static> EventChannel<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Listeners {
                next_id: AtomicU64::new(0),
                list: Mutex::new(Arc::new(Vec::new())),
            }),
        }
    }

    /// Register `handler` and return the handle that removes it again.
    pub fn subscribe<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut list = self.shared.list.lock();
            let mut next: Vec<Listener<T>> = list
                .iter()
                .map(|l| Listener {
                    id: l.id,
                    handler: l.handler.clone(),
                })
                .collect();
            next.push(Listener {
                id,
                handler: Arc::new(handler),
            });
            *list = Arc::new(next);
        }

        let weak: Weak<Listeners<T>> = Arc::downgrade(&self.shared);
        Unsubscribe {
            remove: Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.remove(id);
                }
            }),
        }
    }

    /// Call every currently subscribed handler with `value`.
    ///
    /// A panicking handler is logged and skipped; the rest still run.
    pub fn emit(&self, value: &T) {
        let snapshot = self.shared.list.lock().clone();
        for listener in snapshot.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| (listener.handler)(value)));
            if result.is_err() {
                tracing::error!(listener = listener.id, "event handler panicked");
            }
        }
    }

    /// Number of subscribed handlers.
    pub fn len(&self) -> usize {
        self.shared.list.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Listeners<T> {
    fn remove(&self, id: u64) {
        let mut list = self.list.lock();
        if !list.iter().any(|l| l.id == id) {
            return;
        }
        let next: Vec<Listener<T>> = list
            .iter()
            .filter(|l| l.id != id)
            .map(|l| Listener {
                id: l.id,
                handler: l.handler.clone(),
            })
            .collect();
        *list = Arc::new(next);
    }
}

/// Removes one handler from its [`EventChannel`].
///
/// Dropping the handle keeps the handler subscribed; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.  Calling it more than
/// once is a no-op.
#[derive(Clone)]
pub struct Unsubscribe {
    remove: Arc<dyn Fn() + Send + Sync>,
}

impl Unsubscribe {
    pub fn unsubscribe(&self) {
        (self.remove)();
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Recorded = Box<dyn Fn(&u32) + Send + Sync>;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Recorded) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for = log.clone();
        let make = move |name: &'static str| {
            let log = log_for.clone();
            Box::new(move |v: &u32| log.lock().push(format!("{name}:{v}"))) as Recorded
        };
        (log, make)
    }

    #[test]
    fn emits_in_subscription_order() {
        let chan = EventChannel::<u32>::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        let c = make("c");
        chan.subscribe(move |v| a(v));
        chan.subscribe(move |v| b(v));
        chan.subscribe(move |v| c(v));

        chan.emit(&7);
        assert_eq!(*log.lock(), vec!["a:7", "b:7", "c:7"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let chan = EventChannel::<u32>::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        chan.subscribe(move |v| a(v));
        let unsub_b = chan.subscribe(move |v| b(v));

        unsub_b.unsubscribe();
        chan.emit(&1);
        assert_eq!(*log.lock(), vec!["a:1"]);
        assert_eq!(chan.len(), 1);
    }

    #[test]
    fn unsubscribe_twice_is_noop() {
        let chan = EventChannel::<u32>::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        let unsub_a = chan.subscribe(move |v| a(v));
        chan.subscribe(move |v| b(v));

        unsub_a.unsubscribe();
        unsub_a.unsubscribe();
        chan.emit(&2);
        assert_eq!(*log.lock(), vec!["b:2"]);
    }

    #[test]
    fn never_emitted_handler_can_be_removed() {
        let chan = EventChannel::<u32>::new();
        let (log, make) = recorder();
        let a = make("a");
        chan.subscribe(move |v| a(v)).unsubscribe();
        chan.emit(&3);
        assert!(log.lock().is_empty());
        assert!(chan.is_empty());
    }

    #[test]
    fn dropping_handle_keeps_subscription() {
        let chan = EventChannel::<u32>::new();
        let (log, make) = recorder();
        let a = make("a");
        drop(chan.subscribe(move |v| a(v)));
        chan.emit(&4);
        assert_eq!(*log.lock(), vec!["a:4"]);
    }

    #[test]
    fn unsubscribe_during_emit_applies_to_next_emit() {
        let chan = Arc::new(EventChannel::<u32>::new());
        let (log, make) = recorder();
        let b = make("b");

        let slot: Arc<Mutex<Option<Unsubscribe>>> = Arc::new(Mutex::new(None));
        let slot_in = slot.clone();
        chan.subscribe(move |_| {
            if let Some(u) = slot_in.lock().as_ref() {
                u.unsubscribe();
            }
        });
        *slot.lock() = Some(chan.subscribe(move |v| b(v)));

        chan.emit(&5);
        chan.emit(&6);
        assert_eq!(*log.lock(), vec!["b:5"]);
    }

    #[test]
    fn panicking_handler_does_not_stop_delivery() {
        let chan = EventChannel::<u32>::new();
        let (log, make) = recorder();
        let b = make("b");
        chan.subscribe(|_| panic!("boom"));
        chan.subscribe(move |v| b(v));

        chan.emit(&8);
        chan.emit(&9);
        assert_eq!(*log.lock(), vec!["b:8", "b:9"]);
    }
}
