//! Listener types for change notification.
//!
//! A Listener pairs a unique ID with a `(cell, previous, current)` closure.
//! The same shape serves both notification channels on a cell: value-changed
//! and identity-changed. Cells hold weak references to registered listeners,
//! so registration never extends a listener's lifetime.

use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::cell::Derived;

/// The closure shape both notification channels invoke:
/// `(cell, previous, current)`.
pub type ListenerFn<T> = Rc<dyn Fn(&Derived<T>, &T, &T)>;

/// Unique identifier for a listener.
///
/// Registration, removal, and membership tests on a cell all match by this
/// ID. Uses an atomic counter to mint IDs, so they are unique process-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A change-notification callback, owned by the host.
///
/// A `Listener` always carries a closure; there is no unbound state to filter
/// out at registration time. Cloning produces another handle to the same
/// closure with the same identity.
pub struct Listener<T>
where
    T: Clone + PartialEq + 'static,
{
    id: ListenerId,
    func: ListenerFn<T>,
}

impl<T> Listener<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new listener from a `(cell, previous, current)` closure.
    pub fn new(func: impl Fn(&Derived<T>, &T, &T) + 'static) -> Self {
        Self {
            id: ListenerId::new(),
            func: Rc::new(func),
        }
    }

    /// Get the listener's unique ID.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Invoke the listener.
    pub fn call(&self, cell: &Derived<T>, previous: &T, current: &T) {
        (self.func)(cell, previous, current);
    }

    pub(crate) fn downgrade(&self) -> Weak<dyn Fn(&Derived<T>, &T, &T)> {
        Rc::downgrade(&self.func)
    }
}

impl<T> Clone for Listener<T>
where
    T: Clone + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            func: Rc::clone(&self.func),
        }
    }
}

impl<T> std::fmt::Debug for Listener<T>
where
    T: Clone + PartialEq + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}
