//! Selection tracking
//!
//! Holds the single selected object and the ordered observer list. Visual
//! marking is applied by the owning [`TreeView`](crate::view::TreeView); this
//! type only records the value and fans out notifications.

use crate::object::{DomainObject, ObjectId};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Observer callback; receives the new value (`None` when cleared).
pub type SelectionCallback = Arc<dyn Fn(Option<&DomainObject>) + Send + Sync>;

#[derive(Default)]
struct ObserverList {
    next_id: u64,
    entries: Vec<(u64, SelectionCallback)>,
}

#[derive(Default)]
pub struct SelectionTracker {
    current: Mutex<Option<DomainObject>>,
    observers: Arc<Mutex<ObserverList>>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<DomainObject> {
        self.current.lock().clone()
    }

    pub fn selected_id(&self) -> Option<ObjectId> {
        self.current.lock().as_ref().map(|o| o.id().clone())
    }

    /// Record the value without notifying observers.
    pub(crate) fn record(&self, value: Option<DomainObject>) {
        *self.current.lock() = value;
    }

    /// Notify every observer registered right now, in registration order.
    ///
    /// The list is copied first so callbacks may observe or unobserve freely.
    pub(crate) fn notify(&self, value: Option<&DomainObject>) {
        let snapshot: Vec<SelectionCallback> = self
            .observers
            .lock()
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        trace!(observers = snapshot.len(), "Notifying selection observers");
        for callback in snapshot {
            callback(value);
        }
    }

    /// Record and notify. Repeated values notify every time.
    pub fn set_value(&self, value: Option<DomainObject>) {
        self.record(value.clone());
        self.notify(value.as_ref());
    }

    pub fn observe(&self, callback: SelectionCallback) -> Unobserve {
        let mut observers = self.observers.lock();
        let id = observers.next_id;
        observers.next_id += 1;
        observers.entries.push((id, callback));
        Unobserve {
            observers: Arc::downgrade(&self.observers),
            id,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().entries.len()
    }
}

/// Removes one observer. Safe to call any number of times.
///
/// Dropping an `Unobserve` leaves the observer registered.
#[derive(Debug, Clone)]
pub struct Unobserve {
    observers: Weak<Mutex<ObserverList>>,
    id: u64,
}

impl Unobserve {
    pub fn unobserve(&self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}
