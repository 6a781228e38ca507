//! Derived Cell Implementation
//!
//! A Derived cell owns an identity value and a cached derived value. The
//! derived value is the result of applying a stack of registered
//! [`Transform`]s to a copy of the identity, highest priority first.
//!
//! # How Cells Work
//!
//! 1. A cell is created with an identity value; the cache starts equal to it.
//!
//! 2. Hosts register transforms and listeners. The cell holds weak
//!    references only: it never owns or extends the lifetime of either.
//!
//! 3. Nothing recomputes automatically. A host triggers a recompute
//!    explicitly (or via the `and_update` flags on the mutating operations),
//!    and the cell walks the sorted transform stack to rebuild the cache.
//!
//! 4. When a recompute produces a value that differs from the previous
//!    cache, value-changed listeners fire. Identity changes fire the
//!    separate identity-changed listeners.
//!
//! # Ordering
//!
//! Transforms run in strictly descending priority order; transforms with
//! equal priority run in registration order. The composition order matters:
//! a "+2" and a "×2" step compose differently depending on which runs first.
//!
//! # Reentrancy
//!
//! The cell's interior borrow is never held while a host-supplied transform
//! or listener runs, so those closures may call back into the cell. Panics
//! they raise are not caught; a panic mid-walk leaves the cache unmodified,
//! since the cache commits only after the full walk.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::listener::{Listener, ListenerFn, ListenerId};
use super::transform::{SlotId, Transform, TransformState};

/// Unique identifier for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(u64);

impl CellId {
    /// Generate a new unique cell ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered transform: identity, registration order, weak state.
///
/// `seq` is a per-cell monotone counter used as the sort tie-break, so
/// equal-priority transforms keep their registration order across re-sorts.
struct SlotEntry<T>
where
    T: 'static,
{
    id: SlotId,
    seq: u64,
    state: Weak<RefCell<TransformState<T>>>,
}

/// A registered listener: identity plus a weak reference to its closure.
struct ListenerEntry<T>
where
    T: Clone + PartialEq + 'static,
{
    id: ListenerId,
    func: Weak<dyn Fn(&Derived<T>, &T, &T)>,
}

struct CellState<T>
where
    T: Clone + PartialEq + 'static,
{
    identity: T,
    cached: T,
    slots: SmallVec<[SlotEntry<T>; 4]>,
    value_listeners: SmallVec<[ListenerEntry<T>; 2]>,
    identity_listeners: SmallVec<[ListenerEntry<T>; 2]>,
    next_seq: u64,
}

/// An identity value derived through a prioritized transform stack.
///
/// Cloning a `Derived` produces another handle to the same cell: both share
/// state and identity.
///
/// # Example
///
/// ```
/// use refract_core::derived::{Derived, Transform};
///
/// let cell = Derived::new(10);
/// let double = Transform::new(|v: &mut i32| *v *= 2);
///
/// cell.add_transform(&double, true);
/// assert_eq!(cell.get(), 20);
///
/// // Higher priority runs first: (10 + 2) * 2, not 10 * 2 + 2.
/// let add_two = Transform::with(|v: &mut i32| *v += 2, 1, true);
/// cell.add_transform(&add_two, true);
/// assert_eq!(cell.get(), 24);
/// ```
pub struct Derived<T>
where
    T: Clone + PartialEq + 'static,
{
    id: CellId,
    state: Rc<RefCell<CellState<T>>>,
}

impl<T> Derived<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a cell whose cached value starts equal to `identity`.
    pub fn new(identity: T) -> Self {
        Self {
            id: CellId::new(),
            state: Rc::new(RefCell::new(CellState {
                cached: identity.clone(),
                identity,
                slots: SmallVec::new(),
                value_listeners: SmallVec::new(),
                identity_listeners: SmallVec::new(),
                next_seq: 0,
            })),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Get the cached derived value without recomputing.
    pub fn get(&self) -> T {
        self.state.borrow().cached.clone()
    }

    /// Recompute, then return the fresh derived value.
    pub fn refresh(&self) -> T {
        self.recompute();
        self.get()
    }

    /// Get the identity value.
    pub fn identity(&self) -> T {
        self.state.borrow().identity.clone()
    }

    // ------------------------------------------------------------------
    // Transform registration
    // ------------------------------------------------------------------

    /// Register a transform and re-sort the stack.
    ///
    /// Duplicate registration is permitted and applies the transform once
    /// per registration. When `and_update` is set, recomputes immediately.
    pub fn add_transform(&self, transform: &Transform<T>, and_update: bool) -> &Self {
        {
            let mut state = self.state.borrow_mut();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.slots.push(SlotEntry {
                id: transform.id(),
                seq,
                state: transform.downgrade(),
            });
            sort_slots(&mut state.slots);
        }
        debug!(cell = ?self.id, slot = ?transform.id(), "transform registered");
        if and_update {
            self.recompute();
        }
        self
    }

    /// Like [`Derived::add_transform`], but a no-op — including the skipped
    /// recompute — when the transform is already registered.
    pub fn add_transform_unique(&self, transform: &Transform<T>, and_update: bool) -> &Self {
        if self.contains_transform(transform) {
            return self;
        }
        self.add_transform(transform, and_update)
    }

    /// Remove the first registration of `transform`, if any.
    ///
    /// The recompute requested by `and_update` only fires when a removal
    /// actually occurred; removing an unregistered transform is a no-op.
    pub fn remove_transform(&self, transform: &Transform<T>, and_update: bool) {
        let removed = {
            let mut state = self.state.borrow_mut();
            match state.slots.iter().position(|entry| entry.id == transform.id()) {
                Some(index) => {
                    state.slots.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            debug!(cell = ?self.id, slot = ?transform.id(), "transform removed");
            if and_update {
                self.recompute();
            }
        }
    }

    /// Whether `transform` is currently registered.
    pub fn contains_transform(&self, transform: &Transform<T>) -> bool {
        self.state
            .borrow()
            .slots
            .iter()
            .any(|entry| entry.id == transform.id())
    }

    /// Number of registered transforms.
    pub fn transform_count(&self) -> usize {
        let mut state = self.state.borrow_mut();
        state.slots.retain(|entry| entry.state.strong_count() > 0);
        state.slots.len()
    }

    // ------------------------------------------------------------------
    // Value-changed listeners
    // ------------------------------------------------------------------

    /// Register a listener for changes to the derived value.
    pub fn add_value_listener(&self, listener: &Listener<T>) -> &Self {
        push_listener(&mut self.state.borrow_mut().value_listeners, listener);
        self
    }

    /// Like [`Derived::add_value_listener`], but a no-op when already
    /// registered.
    pub fn add_value_listener_unique(&self, listener: &Listener<T>) -> &Self {
        let mut state = self.state.borrow_mut();
        if !contains_listener(&state.value_listeners, listener.id()) {
            push_listener(&mut state.value_listeners, listener);
        }
        self
    }

    /// Remove the first registration of `listener`, if any.
    pub fn remove_value_listener(&self, listener: &Listener<T>) {
        remove_listener(&mut self.state.borrow_mut().value_listeners, listener.id());
    }

    /// Whether `listener` is registered on the value-changed channel.
    pub fn contains_value_listener(&self, listener: &Listener<T>) -> bool {
        contains_listener(&self.state.borrow().value_listeners, listener.id())
    }

    /// Number of registered value-changed listeners.
    pub fn value_listener_count(&self) -> usize {
        let mut state = self.state.borrow_mut();
        state
            .value_listeners
            .retain(|entry| entry.func.strong_count() > 0);
        state.value_listeners.len()
    }

    // ------------------------------------------------------------------
    // Identity-changed listeners
    // ------------------------------------------------------------------

    /// Register a listener for changes to the identity value.
    pub fn add_identity_listener(&self, listener: &Listener<T>) -> &Self {
        push_listener(&mut self.state.borrow_mut().identity_listeners, listener);
        self
    }

    /// Like [`Derived::add_identity_listener`], but a no-op when already
    /// registered.
    pub fn add_identity_listener_unique(&self, listener: &Listener<T>) -> &Self {
        let mut state = self.state.borrow_mut();
        if !contains_listener(&state.identity_listeners, listener.id()) {
            push_listener(&mut state.identity_listeners, listener);
        }
        self
    }

    /// Remove the first registration of `listener`, if any.
    pub fn remove_identity_listener(&self, listener: &Listener<T>) {
        remove_listener(
            &mut self.state.borrow_mut().identity_listeners,
            listener.id(),
        );
    }

    /// Whether `listener` is registered on the identity-changed channel.
    pub fn contains_identity_listener(&self, listener: &Listener<T>) -> bool {
        contains_listener(&self.state.borrow().identity_listeners, listener.id())
    }

    /// Number of registered identity-changed listeners.
    pub fn identity_listener_count(&self) -> usize {
        let mut state = self.state.borrow_mut();
        state
            .identity_listeners
            .retain(|entry| entry.func.strong_count() > 0);
        state.identity_listeners.len()
    }

    // ------------------------------------------------------------------
    // Recompute and identity
    // ------------------------------------------------------------------

    /// Rebuild the cached derived value from the identity.
    ///
    /// Walks the transform stack in sorted order, applying every enabled,
    /// bound transform to a working copy of the identity. The cache commits
    /// after the full walk; if the result differs from the previous cache,
    /// every value-changed listener is invoked with
    /// `(cell, previous, current)` in registration order.
    ///
    /// Transforms whose host has dropped them are skipped and pruned.
    pub fn recompute(&self) {
        let (mut working, slots) = {
            let mut state = self.state.borrow_mut();
            state.slots.retain(|entry| entry.state.strong_count() > 0);
            let slots: Vec<Rc<RefCell<TransformState<T>>>> = state
                .slots
                .iter()
                .filter_map(|entry| entry.state.upgrade())
                .collect();
            (state.identity.clone(), slots)
        };

        for slot in slots {
            // Unbound transforms are skipped: the function can still be set
            // after registration.
            let func = {
                let slot = slot.borrow();
                if slot.enabled {
                    slot.func.clone()
                } else {
                    None
                }
            };
            if let Some(func) = func {
                func(&mut working);
            }
        }

        let previous = {
            let mut state = self.state.borrow_mut();
            mem::replace(&mut state.cached, working.clone())
        };

        if previous != working {
            trace!(cell = ?self.id, "derived value changed");
            // Bind the snapshot first: the interior borrow must end before
            // any listener runs.
            let listeners = snapshot_listeners(&mut self.state.borrow_mut().value_listeners);
            for func in listeners {
                func(self, &previous, &working);
            }
        }
    }

    /// Replace the identity value.
    ///
    /// Setting an identity equal to the current one is a silent no-op: no
    /// recompute, no notification. Otherwise the identity is replaced,
    /// `and_update` optionally forces a recompute now (so value-changed
    /// listeners fire before identity-changed listeners), and every
    /// identity-changed listener is invoked with `(cell, previous, current)`
    /// in registration order.
    pub fn set_identity(&self, value: T, and_update: bool) {
        let previous = {
            let mut state = self.state.borrow_mut();
            if state.identity == value {
                return;
            }
            mem::replace(&mut state.identity, value)
        };

        trace!(cell = ?self.id, "identity changed");
        if and_update {
            self.recompute();
        }

        let current = self.state.borrow().identity.clone();
        let listeners = snapshot_listeners(&mut self.state.borrow_mut().identity_listeners);
        for func in listeners {
            func(self, &previous, &current);
        }
    }
}

impl<T> Clone for Derived<T>
where
    T: Clone + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for Derived<T>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Derived")
            .field("id", &self.id)
            .field("identity", &state.identity)
            .field("value", &state.cached)
            .field("transforms", &state.slots.len())
            .finish()
    }
}

/// Re-sort the stack: descending priority, registration order among ties.
///
/// Entries whose transform has been dropped are pruned first.
fn sort_slots<T>(slots: &mut SmallVec<[SlotEntry<T>; 4]>)
where
    T: 'static,
{
    slots.retain(|entry| entry.state.strong_count() > 0);
    slots.sort_by_key(|entry| {
        let priority = entry
            .state
            .upgrade()
            .map(|slot| slot.borrow().priority)
            .unwrap_or(i32::MIN);
        (Reverse(priority), entry.seq)
    });
}

fn push_listener<T>(list: &mut SmallVec<[ListenerEntry<T>; 2]>, listener: &Listener<T>)
where
    T: Clone + PartialEq + 'static,
{
    list.push(ListenerEntry {
        id: listener.id(),
        func: listener.downgrade(),
    });
}

fn remove_listener<T>(list: &mut SmallVec<[ListenerEntry<T>; 2]>, id: ListenerId)
where
    T: Clone + PartialEq + 'static,
{
    if let Some(index) = list.iter().position(|entry| entry.id == id) {
        list.remove(index);
    }
}

fn contains_listener<T>(list: &SmallVec<[ListenerEntry<T>; 2]>, id: ListenerId) -> bool
where
    T: Clone + PartialEq + 'static,
{
    list.iter().any(|entry| entry.id == id)
}

/// Collect strong references to the live listeners, pruning dead entries.
///
/// The snapshot is taken so the interior borrow is released before any
/// listener runs.
fn snapshot_listeners<T>(list: &mut SmallVec<[ListenerEntry<T>; 2]>) -> Vec<ListenerFn<T>>
where
    T: Clone + PartialEq + 'static,
{
    list.retain(|entry| entry.func.strong_count() > 0);
    list.iter().filter_map(|entry| entry.func.upgrade()).collect()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn cache_starts_equal_to_identity() {
        let cell = Derived::new(42);
        assert_eq!(cell.get(), 42);
        assert_eq!(cell.identity(), 42);
    }

    #[test]
    fn add_transform_with_update_recomputes() {
        let cell = Derived::new(10);
        let double = Transform::new(|v: &mut i32| *v *= 2);

        cell.add_transform(&double, true);
        assert_eq!(cell.get(), 20);
    }

    #[test]
    fn higher_priority_runs_first() {
        let cell = Derived::new(10);
        let double = Transform::new(|v: &mut i32| *v *= 2);
        let add_two = Transform::with(|v: &mut i32| *v += 2, 1, true);

        cell.add_transform(&double, true);
        assert_eq!(cell.get(), 20);

        // add_two outranks double, so the order is (10 + 2) * 2.
        cell.add_transform(&add_two, true);
        assert_eq!(cell.get(), 24);
    }

    #[test]
    fn equal_priority_runs_in_registration_order() {
        let add_two = Transform::new(|v: &mut i32| *v += 2);
        let double = Transform::new(|v: &mut i32| *v *= 2);

        let add_first = Derived::new(10);
        add_first.add_transform(&add_two, false).add_transform(&double, false);
        assert_eq!(add_first.refresh(), 24);

        let double_first = Derived::new(10);
        double_first.add_transform(&double, false).add_transform(&add_two, false);
        assert_eq!(double_first.refresh(), 22);
    }

    #[test]
    fn recompute_is_idempotent() {
        let cell = Derived::new(3);
        let square = Transform::new(|v: &mut i32| *v *= *v);
        cell.add_transform(&square, false);

        cell.recompute();
        let first = cell.get();
        cell.recompute();
        cell.recompute();
        assert_eq!(cell.get(), first);
        assert_eq!(first, 9);
    }

    #[test]
    fn disabled_transform_is_excluded() {
        let cell = Derived::new(10);
        let double = Transform::new(|v: &mut i32| *v *= 2);
        cell.add_transform(&double, true);
        assert_eq!(cell.get(), 20);

        double.disable();
        assert_eq!(cell.refresh(), 10);

        double.enable();
        assert_eq!(cell.refresh(), 20);
    }

    #[test]
    fn duplicate_registration_applies_twice() {
        let cell = Derived::new(0);
        let add_one = Transform::new(|v: &mut i32| *v += 1);

        cell.add_transform(&add_one, false);
        cell.add_transform(&add_one, false);
        assert_eq!(cell.transform_count(), 2);
        assert_eq!(cell.refresh(), 2);
    }

    #[test]
    fn unique_add_is_idempotent() {
        let cell = Derived::new(0);
        let add_one = Transform::new(|v: &mut i32| *v += 1);

        cell.add_transform_unique(&add_one, true);
        cell.add_transform_unique(&add_one, true);

        assert_eq!(cell.transform_count(), 1);
        assert_eq!(cell.refresh(), 1);
    }

    #[test]
    fn removing_unregistered_transform_is_a_no_op() {
        let cell = Derived::new(5);
        let stranger = Transform::new(|v: &mut i32| *v += 100);

        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let listener = Listener::new(move |_: &Derived<i32>, _: &i32, _: &i32| {
            calls_clone.set(calls_clone.get() + 1);
        });
        cell.add_value_listener(&listener);

        cell.remove_transform(&stranger, true);

        assert_eq!(cell.get(), 5);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn value_listener_sees_previous_and_current() {
        let cell = Derived::new(10);

        let observed = Rc::new(RefCell::new(Vec::new()));
        let observed_clone = observed.clone();
        let listener = Listener::new(move |_: &Derived<i32>, previous: &i32, current: &i32| {
            observed_clone.borrow_mut().push((*previous, *current));
        });
        cell.add_value_listener(&listener);

        // No transform yet: recompute leaves the value unchanged.
        cell.recompute();
        assert!(observed.borrow().is_empty());

        let double = Transform::new(|v: &mut i32| *v *= 2);
        cell.add_transform(&double, true);
        assert_eq!(&*observed.borrow(), &[(10, 20)]);
    }

    #[test]
    fn unchanged_output_suppresses_value_listeners() {
        let cell = Derived::new(7);
        let identity_transform = Transform::new(|_: &mut i32| {});
        cell.add_transform(&identity_transform, false);

        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let listener = Listener::new(move |_: &Derived<i32>, _: &i32, _: &i32| {
            calls_clone.set(calls_clone.get() + 1);
        });
        cell.add_value_listener(&listener);

        cell.recompute();
        cell.recompute();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn set_identity_to_equal_value_is_a_no_op() {
        let cell = Derived::new(10);

        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let listener = Listener::new(move |_: &Derived<i32>, _: &i32, _: &i32| {
            calls_clone.set(calls_clone.get() + 1);
        });
        cell.add_identity_listener(&listener);

        cell.set_identity(10, true);
        assert_eq!(calls.get(), 0);
        assert_eq!(cell.get(), 10);
    }

    #[test]
    fn set_identity_notifies_identity_listeners() {
        let cell = Derived::new(1);

        let observed = Rc::new(RefCell::new(Vec::new()));
        let observed_clone = observed.clone();
        let listener = Listener::new(move |_: &Derived<i32>, previous: &i32, current: &i32| {
            observed_clone.borrow_mut().push((*previous, *current));
        });
        cell.add_identity_listener(&listener);

        cell.set_identity(5, false);
        assert_eq!(&*observed.borrow(), &[(1, 5)]);

        // Without and_update the cache still holds the old derivation.
        assert_eq!(cell.get(), 1);
        assert_eq!(cell.refresh(), 5);
    }

    #[test]
    fn value_listeners_fire_before_identity_listeners_on_updating_set() {
        let cell = Derived::new(1);
        let double = Transform::new(|v: &mut i32| *v *= 2);
        cell.add_transform(&double, true);

        let order = Rc::new(RefCell::new(Vec::new()));

        let order_value = order.clone();
        let value_listener = Listener::new(move |_: &Derived<i32>, _: &i32, _: &i32| {
            order_value.borrow_mut().push("value");
        });
        let order_identity = order.clone();
        let identity_listener = Listener::new(move |_: &Derived<i32>, _: &i32, _: &i32| {
            order_identity.borrow_mut().push("identity");
        });

        cell.add_value_listener(&value_listener);
        cell.add_identity_listener(&identity_listener);

        cell.set_identity(3, true);
        assert_eq!(&*order.borrow(), &["value", "identity"]);
        assert_eq!(cell.get(), 6);
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let cell = Derived::new(0);
        let bump = Transform::new(|v: &mut i32| *v += 1);

        let order = Rc::new(RefCell::new(Vec::new()));
        let order_a = order.clone();
        let first = Listener::new(move |_: &Derived<i32>, _: &i32, _: &i32| {
            order_a.borrow_mut().push("first");
        });
        let order_b = order.clone();
        let second = Listener::new(move |_: &Derived<i32>, _: &i32, _: &i32| {
            order_b.borrow_mut().push("second");
        });

        cell.add_value_listener(&first).add_value_listener(&second);
        cell.add_transform(&bump, true);

        assert_eq!(&*order.borrow(), &["first", "second"]);
    }

    #[test]
    fn dropped_transform_is_skipped() {
        let cell = Derived::new(1);
        let add_one = Transform::new(|v: &mut i32| *v += 1);
        cell.add_transform(&add_one, true);
        assert_eq!(cell.get(), 2);

        drop(add_one);
        assert_eq!(cell.refresh(), 1);
        assert_eq!(cell.transform_count(), 0);
    }

    #[test]
    fn dropped_listener_is_not_invoked() {
        let cell = Derived::new(1);
        let double = Transform::new(|v: &mut i32| *v *= 2);

        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let listener = Listener::new(move |_: &Derived<i32>, _: &i32, _: &i32| {
            calls_clone.set(calls_clone.get() + 1);
        });
        cell.add_value_listener(&listener);
        drop(listener);

        cell.add_transform(&double, true);
        assert_eq!(cell.get(), 2);
        assert_eq!(calls.get(), 0);
        assert_eq!(cell.value_listener_count(), 0);
    }

    #[test]
    fn listener_may_reenter_the_cell() {
        let cell = Derived::new(2);
        let double = Transform::new(|v: &mut i32| *v *= 2);

        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        let listener = Listener::new(move |cell: &Derived<i32>, _: &i32, _: &i32| {
            seen_clone.set(cell.get());
        });
        cell.add_value_listener(&listener);

        cell.add_transform(&double, true);
        assert_eq!(seen.get(), 4);
    }

    #[test]
    fn one_transform_can_serve_multiple_cells() {
        let double = Transform::new(|v: &mut i32| *v *= 2);

        let a = Derived::new(3);
        let b = Derived::new(5);
        a.add_transform(&double, true);
        b.add_transform(&double, true);

        assert_eq!(a.get(), 6);
        assert_eq!(b.get(), 10);

        double.disable();
        assert_eq!(a.refresh(), 3);
        assert_eq!(b.refresh(), 5);
    }

    #[test]
    fn listener_channels_are_independent() {
        let cell = Derived::new(0);
        let listener: Listener<i32> = Listener::new(|_, _, _| {});

        cell.add_value_listener(&listener);
        assert!(cell.contains_value_listener(&listener));
        assert!(!cell.contains_identity_listener(&listener));

        cell.remove_value_listener(&listener);
        assert!(!cell.contains_value_listener(&listener));
    }

    #[test]
    fn unique_listener_add_is_idempotent() {
        let cell = Derived::new(0);
        let bump = Transform::new(|v: &mut i32| *v += 1);

        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let listener = Listener::new(move |_: &Derived<i32>, _: &i32, _: &i32| {
            calls_clone.set(calls_clone.get() + 1);
        });

        cell.add_value_listener_unique(&listener);
        cell.add_value_listener_unique(&listener);
        assert_eq!(cell.value_listener_count(), 1);

        cell.add_transform(&bump, true);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn duplicate_listener_registration_invokes_twice() {
        let cell = Derived::new(0);
        let bump = Transform::new(|v: &mut i32| *v += 1);

        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let listener = Listener::new(move |_: &Derived<i32>, _: &i32, _: &i32| {
            calls_clone.set(calls_clone.get() + 1);
        });

        cell.add_value_listener(&listener);
        cell.add_value_listener(&listener);

        cell.add_transform(&bump, true);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn unbound_transform_participates_once_set() {
        let cell = Derived::new(4);
        let pending: Transform<i32> = Transform::unbound();

        cell.add_transform(&pending, true);
        assert_eq!(cell.get(), 4);

        pending.set(|v| *v += 10, 0, true);
        assert_eq!(cell.refresh(), 14);
    }
}
