//! Transform Implementation
//!
//! A Transform is one step in a cell's derivation chain. It holds a function
//! that mutates a working value in place, a priority that orders it relative
//! to the other transforms registered with the same cell, and an enabled flag.
//!
//! # How Transforms Work
//!
//! 1. A transform is created and owned by its host (or by a
//!    [`ScopedTransform`](super::ScopedTransform)).
//!
//! 2. It is registered with one or more [`Derived`](super::Derived) cells,
//!    which hold weak references back to it.
//!
//! 3. During a recompute, each cell applies its enabled, bound transforms to
//!    a copy of the identity value, highest priority first.
//!
//! A transform may be created unbound and given a function later; an unbound
//! transform applies as a no-op.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// The function shape a transform applies: mutate a working value in place.
pub type TransformFn<T> = Rc<dyn Fn(&mut T)>;

/// Unique identifier for a transform.
///
/// Each transform gets a unique ID when created. Registration, removal, and
/// membership tests on a cell all match by this ID, so two transforms with
/// identical functions and priorities remain distinct entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

impl SlotId {
    /// Generate a new unique slot ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared interior of a transform.
///
/// Cells hold `Weak` references to this state, so a registration never keeps
/// a dropped transform alive.
pub(crate) struct TransformState<T>
where
    T: 'static,
{
    pub(crate) func: Option<TransformFn<T>>,
    pub(crate) priority: i32,
    pub(crate) enabled: bool,
}

/// A prioritized, enable-able transformation step.
///
/// Cloning a `Transform` produces another handle to the same underlying slot:
/// both share state and identity.
///
/// # Example
///
/// ```
/// use refract_core::derived::Transform;
///
/// let double = Transform::new(|v: &mut i32| *v *= 2);
/// let mut value = 10;
/// double.apply(&mut value);
/// assert_eq!(value, 20);
/// ```
pub struct Transform<T>
where
    T: 'static,
{
    id: SlotId,
    state: Rc<RefCell<TransformState<T>>>,
}

impl<T> Transform<T>
where
    T: 'static,
{
    /// The highest priority a transform can carry; applied first.
    pub const MAX_PRIORITY: i32 = i32::MAX;

    /// The lowest priority a transform can carry; applied last.
    pub const MIN_PRIORITY: i32 = i32::MIN;

    /// Create an enabled transform with priority 0.
    pub fn new(func: impl Fn(&mut T) + 'static) -> Self {
        Self::with(func, 0, true)
    }

    /// Create a transform with every field specified.
    pub fn with(func: impl Fn(&mut T) + 'static, priority: i32, enabled: bool) -> Self {
        Self {
            id: SlotId::new(),
            state: Rc::new(RefCell::new(TransformState {
                func: Some(Rc::new(func)),
                priority,
                enabled,
            })),
        }
    }

    /// Create an enabled transform with no function.
    ///
    /// The function can be supplied later with [`Transform::set`]; until then
    /// the transform applies as a no-op.
    pub fn unbound() -> Self {
        Self {
            id: SlotId::new(),
            state: Rc::new(RefCell::new(TransformState {
                func: None,
                priority: 0,
                enabled: true,
            })),
        }
    }

    /// Get the transform's unique ID.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Replace function, priority, and enabled state together.
    pub fn set(&self, func: impl Fn(&mut T) + 'static, priority: i32, enabled: bool) {
        let mut state = self.state.borrow_mut();
        state.func = Some(Rc::new(func));
        state.priority = priority;
        state.enabled = enabled;
    }

    /// Enable the transform.
    ///
    /// A transform has no back-references to the cells holding it, so this
    /// never recomputes anything: call [`Derived::recompute`] afterwards, or
    /// use a [`ScopedTransform`] which can do both in one step.
    ///
    /// [`Derived::recompute`]: super::Derived::recompute
    /// [`ScopedTransform`]: super::ScopedTransform
    pub fn enable(&self) {
        self.state.borrow_mut().enabled = true;
    }

    /// Disable the transform. See [`Transform::enable`] for recompute notes.
    pub fn disable(&self) {
        self.state.borrow_mut().enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    pub fn priority(&self) -> i32 {
        self.state.borrow().priority
    }

    /// Whether a function is currently bound.
    pub fn is_bound(&self) -> bool {
        self.state.borrow().func.is_some()
    }

    /// Get the bound function, if any.
    pub fn func(&self) -> Option<TransformFn<T>> {
        self.state.borrow().func.clone()
    }

    /// Apply the bound function to `value` in place; no-op when unbound.
    ///
    /// Panics raised by the host function propagate to the caller.
    pub fn apply(&self, value: &mut T) {
        // The interior borrow must not be held across the host call.
        let func = self.state.borrow().func.clone();
        if let Some(func) = func {
            func(value);
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<TransformState<T>>> {
        Rc::downgrade(&self.state)
    }
}

impl<T> Clone for Transform<T>
where
    T: 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> Default for Transform<T>
where
    T: 'static,
{
    fn default() -> Self {
        Self::unbound()
    }
}

impl<T> fmt::Debug for Transform<T>
where
    T: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Transform")
            .field("id", &self.id)
            .field("priority", &state.priority)
            .field("enabled", &state.enabled)
            .field("bound", &state.func.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
