//! Granular key/value store with per-key subscriptions.
//!
//! Every entry is addressed by a string name such as `position:3` and keeps
//! its own subscriber list. Writing one key only ever notifies the callbacks
//! registered for that exact key, which is what lets the list engine move a
//! single container without touching the others.
//!
//! Names do not need to be declared up front: the first `set` or `subscribe`
//! for a name creates its entry.
//!
//! Writes can be grouped with [`BindingStore::batch`]. Inside a batch values
//! are stored immediately (so `get` observes them) but notifications are held
//! back until the outermost batch ends; a key whose value ends the batch equal
//! to what it was before the batch is not notified at all.

use crate::collections::map::{HashMap, HashSet};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifier handed out for each registered callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback<V> = Rc<dyn Fn(&V)>;

struct Entry<V> {
    value: Option<V>,
    subscribers: SmallVec<[(SubscriberId, Callback<V>); 2]>,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            value: None,
            subscribers: SmallVec::new(),
        }
    }
}

struct StoreInner<V> {
    entries: RefCell<HashMap<String, Entry<V>>>,
    next_subscriber: Cell<u64>,
    batch_depth: Cell<usize>,
    /// Keys written during the current batch with the value they held before it.
    pending: RefCell<Vec<(String, Option<V>)>>,
    pending_names: RefCell<HashSet<String>>,
    /// Number of callback invocations delivered so far (diagnostic).
    delivered: Cell<u64>,
}

/// Shared handle to a binding store.
///
/// Cloning is cheap and every clone addresses the same entries. The store is
/// single-threaded; all reads, writes and callbacks happen on the thread that
/// owns the list.
pub struct BindingStore<V> {
    inner: Rc<StoreInner<V>>,
}

impl<V> Clone for BindingStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for BindingStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingStore")
            .field("entries", &self.inner.entries.borrow().len())
            .field("batch_depth", &self.inner.batch_depth.get())
            .field("delivered", &self.inner.delivered.get())
            .finish()
    }
}

impl<V: Clone + PartialEq + 'static> Default for BindingStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq + 'static> BindingStore<V> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                entries: RefCell::new(HashMap::default()),
                next_subscriber: Cell::new(1),
                batch_depth: Cell::new(0),
                pending: RefCell::new(Vec::new()),
                pending_names: RefCell::new(HashSet::default()),
                delivered: Cell::new(0),
            }),
        }
    }

    /// Returns a clone of the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner
            .entries
            .borrow()
            .get(key)
            .and_then(|entry| entry.value.clone())
    }

    /// Runs `f` with a reference to the value under `key` without cloning it.
    pub fn with<R>(&self, key: &str, f: impl FnOnce(Option<&V>) -> R) -> R {
        let entries = self.inner.entries.borrow();
        f(entries.get(key).and_then(|entry| entry.value.as_ref()))
    }

    /// Stores `value` under `key`.
    ///
    /// Returns `false` and notifies nobody when the key already holds an
    /// equal value. Otherwise the subscribers of `key` (and only those) are
    /// called, immediately or at the end of the enclosing batch.
    pub fn set(&self, key: &str, value: V) -> bool {
        let previous = {
            let mut entries = self.inner.entries.borrow_mut();
            if let Some(entry) = entries.get_mut(key) {
                if entry.value.as_ref() == Some(&value) {
                    return false;
                }
                entry.value.replace(value.clone())
            } else {
                entries.insert(
                    key.to_owned(),
                    Entry {
                        value: Some(value.clone()),
                        subscribers: SmallVec::new(),
                    },
                );
                None
            }
        };

        if self.inner.batch_depth.get() > 0 {
            if self.inner.pending_names.borrow_mut().insert(key.to_owned()) {
                self.inner
                    .pending
                    .borrow_mut()
                    .push((key.to_owned(), previous));
            }
            return true;
        }

        self.deliver(key, &value);
        true
    }

    /// Registers `callback` for changes of `key`.
    ///
    /// The callback is not invoked for the current value. Dropping the
    /// returned [`Subscription`] unregisters it.
    pub fn subscribe(&self, key: &str, callback: impl Fn(&V) + 'static) -> Subscription {
        let id = SubscriberId(self.inner.next_subscriber.get());
        self.inner.next_subscriber.set(id.0 + 1);
        self.inner
            .entries
            .borrow_mut()
            .entry(key.to_owned())
            .or_default()
            .subscribers
            .push((id, Rc::new(callback)));

        let weak: Weak<StoreInner<V>> = Rc::downgrade(&self.inner);
        let name = key.to_owned();
        Subscription {
            id,
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    if let Some(entry) = inner.entries.borrow_mut().get_mut(&name) {
                        entry.subscribers.retain(|(sub, _)| *sub != id);
                    }
                }
            })),
        }
    }

    /// Runs `f` with notifications deferred until it returns.
    ///
    /// Batches nest; only the outermost one flushes.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = BatchScope::enter(self);
        f()
    }

    /// Number of callbacks currently registered for `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.inner
            .entries
            .borrow()
            .get(key)
            .map_or(0, |entry| entry.subscribers.len())
    }

    /// Total callback invocations delivered since the store was created.
    pub fn delivered_notifications(&self) -> u64 {
        self.inner.delivered.get()
    }

    pub fn is_batching(&self) -> bool {
        self.inner.batch_depth.get() > 0
    }

    fn deliver(&self, key: &str, value: &V) {
        // Clone the callbacks out so a callback may read, write or
        // (un)subscribe without hitting a live borrow.
        let callbacks: SmallVec<[Callback<V>; 4]> = self
            .inner
            .entries
            .borrow()
            .get(key)
            .map(|entry| entry.subscribers.iter().map(|(_, cb)| Rc::clone(cb)).collect())
            .unwrap_or_default();

        for callback in callbacks {
            self.inner.delivered.set(self.inner.delivered.get() + 1);
            callback(value);
        }
    }

    fn flush(&self) {
        let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
        self.inner.pending_names.borrow_mut().clear();
        if pending.is_empty() {
            return;
        }
        log::trace!("binding store: flushing {} batched keys", pending.len());
        for (key, before) in pending {
            let Some(current) = self.get(&key) else {
                continue;
            };
            if before.as_ref() == Some(&current) {
                continue;
            }
            self.deliver(&key, &current);
        }
    }
}

struct BatchScope<'a, V: Clone + PartialEq + 'static> {
    store: &'a BindingStore<V>,
}

impl<'a, V: Clone + PartialEq + 'static> BatchScope<'a, V> {
    fn enter(store: &'a BindingStore<V>) -> Self {
        let depth = &store.inner.batch_depth;
        depth.set(depth.get() + 1);
        Self { store }
    }
}

impl<V: Clone + PartialEq + 'static> Drop for BatchScope<'_, V> {
    fn drop(&mut self) {
        let depth = &self.store.inner.batch_depth;
        depth.set(depth.get() - 1);
        if depth.get() == 0 && !std::thread::panicking() {
            self.store.flush();
        }
    }
}

/// Registration handle returned by [`BindingStore::subscribe`].
///
/// The callback stays registered for as long as this value lives.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    id: SubscriberId,
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Unregisters the callback now.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<i32>>>, impl Fn(&i32) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |value: &i32| sink.borrow_mut().push(*value))
    }

    #[test]
    fn get_returns_none_for_unknown_key() {
        let store = BindingStore::<i32>::new();
        assert_eq!(store.get("position:0"), None);
    }

    #[test]
    fn set_notifies_only_subscribers_of_that_key() {
        let store = BindingStore::new();
        let (first, cb_first) = recorder();
        let (second, cb_second) = recorder();
        let _a = store.subscribe("position:0", cb_first);
        let _b = store.subscribe("position:1", cb_second);

        assert!(store.set("position:0", 10));

        assert_eq!(*first.borrow(), vec![10]);
        assert!(second.borrow().is_empty());
        assert_eq!(store.get("position:0"), Some(10));
    }

    #[test]
    fn writing_same_value_is_a_no_op() {
        let store = BindingStore::new();
        let (seen, cb) = recorder();
        let _sub = store.subscribe("column:2", cb);

        assert!(store.set("column:2", 1));
        assert!(!store.set("column:2", 1));

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(store.delivered_notifications(), 1);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let store = BindingStore::new();
        let (seen, cb) = recorder();
        let sub = store.subscribe("itemKey:0", cb);
        assert_eq!(store.subscriber_count("itemKey:0"), 1);

        drop(sub);
        store.set("itemKey:0", 5);

        assert_eq!(store.subscriber_count("itemKey:0"), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn batch_defers_notifications_until_end() {
        let store = BindingStore::new();
        let (seen, cb) = recorder();
        let _sub = store.subscribe("position:0", cb);

        store.batch(|| {
            store.set("position:0", 1);
            store.set("position:0", 2);
            assert_eq!(store.get("position:0"), Some(2));
            assert!(seen.borrow().is_empty());
        });

        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn batch_that_restores_original_value_is_silent() {
        let store = BindingStore::new();
        store.set("position:0", 7);
        let (seen, cb) = recorder();
        let _sub = store.subscribe("position:0", cb);

        store.batch(|| {
            store.set("position:0", 8);
            store.set("position:0", 7);
        });

        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn batch_notifies_each_written_key_once_in_write_order() {
        let store = BindingStore::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<_> = (0..50)
            .map(|slot| {
                let sink = Rc::clone(&order);
                store.subscribe(&format!("position:{slot}"), move |value: &i32| {
                    sink.borrow_mut().push(*value)
                })
            })
            .collect();

        store.batch(|| {
            for round in 0..3 {
                for slot in (0..50).rev() {
                    store.set(&format!("position:{slot}"), slot * 10 + round);
                }
            }
        });

        let expected: Vec<i32> = (0..50).rev().map(|slot| slot * 10 + 2).collect();
        assert_eq!(*order.borrow(), expected);

        // Names tracked by the finished batch do not leak into the next one.
        order.borrow_mut().clear();
        store.batch(|| store.set("position:7", -1));
        assert_eq!(*order.borrow(), vec![-1]);
        drop(subs);
    }

    #[test]
    fn nested_batches_flush_once() {
        let store = BindingStore::new();
        let (seen, cb) = recorder();
        let _sub = store.subscribe("k", cb);

        store.batch(|| {
            store.batch(|| {
                store.set("k", 1);
            });
            assert!(seen.borrow().is_empty());
            store.set("k", 3);
        });

        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn callback_can_write_other_keys() {
        let store = BindingStore::new();
        let echo = store.clone();
        let _sub = store.subscribe("a", move |value: &i32| {
            echo.set("b", value * 2);
        });

        store.set("a", 21);

        assert_eq!(store.get("b"), Some(42));
    }

    #[test]
    fn subscription_outliving_store_drops_cleanly() {
        let store = BindingStore::<i32>::new();
        let sub = store.subscribe("a", |_| {});
        drop(store);
        sub.cancel();
    }
}
