//! Observable state cell.
//!
//! A cell holds one immutable snapshot at a time. Writers replace the whole
//! snapshot with [`StateCell::emit`]; readers take an `Arc` snapshot and
//! never mutate it. Listeners registered with [`StateCell::subscribe`] are
//! called after every accepted emit.
//!
//! A cell can be detached once the view that owns it goes away. Emits on a
//! detached cell are dropped, so a request that completes late cannot write
//! into state nobody is watching.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct StateCell<T> {
    current: ArcSwap<T>,
    listeners: Arc<DashMap<u64, Listener<T>>>,
    next_id: AtomicU64,
    live: AtomicBool,
}

impl<T: Send + Sync + 'static> StateCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            listeners: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
            live: AtomicBool::new(true),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Replace the snapshot and notify listeners.
    ///
    /// Returns `false` (and changes nothing) when the cell is detached.
    pub fn emit(&self, next: T) -> bool {
        if !self.is_live() {
            return false;
        }
        let next = Arc::new(next);
        self.current.store(Arc::clone(&next));

        // Collect first so a listener may (un)subscribe without holding a shard lock.
        let listeners: Vec<Listener<T>> = self.listeners.iter().map(|l| Arc::clone(l.value())).collect();
        for listener in listeners {
            listener(&next);
        }
        true
    }

    /// Derive the next snapshot from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let current = self.snapshot();
        self.emit(f(&current))
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));

        let listeners: Weak<DashMap<u64, Listener<T>>> = Arc::downgrade(&self.listeners);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(listeners) = listeners.upgrade() {
                    listeners.remove(&id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Stop accepting emits and drop all listeners.
    pub fn detach(&self) {
        self.live.store(false, Ordering::Release);
        self.listeners.clear();
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

impl<T: Default + Send + Sync + 'static> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Handle returned by [`StateCell::subscribe`].
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}
