//! Scoped Wrappers
//!
//! Lifetime glue between a cell and one transform or listener. Each wrapper
//! registers its payload on construction and deregisters it in `Drop`, so
//! the registration can never outlive the host that owns the wrapper.
//!
//! Three variants:
//!
//! - [`ScopedTransform`] — owns a [`Transform`] bound to one cell, with
//!   optional recompute on attach and on detach.
//! - [`ScopedValueListener`] — binds one value-changed listener to a cell.
//! - [`ScopedIdentityListener`] — the identity-changed twin.
//!
//! The transform wrapper's target cell is fixed at construction; the
//! listener wrappers can be re-pointed with their `set_*` methods, which
//! deregister the old pairing before registering the new one.

use super::cell::Derived;
use super::listener::Listener;
use super::transform::Transform;

/// Owns a transform and keeps it registered with one cell for exactly this
/// wrapper's lifetime.
///
/// # Example
///
/// ```
/// use refract_core::derived::{Derived, ScopedTransform};
///
/// let cell = Derived::new(10);
/// {
///     let _boost = ScopedTransform::new(&cell, |v: &mut i32| *v *= 3, 0, true, true, true);
///     assert_eq!(cell.get(), 30);
/// }
/// // The boost deregistered itself on drop and recomputed.
/// assert_eq!(cell.get(), 10);
/// ```
pub struct ScopedTransform<T>
where
    T: Clone + PartialEq + 'static,
{
    cell: Option<Derived<T>>,
    transform: Transform<T>,
    update_on_drop: bool,
}

impl<T> ScopedTransform<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a wrapper around an unbound transform, registering it with the
    /// cell when one is given. The function can be supplied later with
    /// [`ScopedTransform::set`].
    pub fn unbound(cell: Option<&Derived<T>>, update_on_drop: bool) -> Self {
        let transform = Transform::unbound();
        let cell = cell.cloned();
        if let Some(cell) = &cell {
            cell.add_transform(&transform, false);
        }
        Self {
            cell,
            transform,
            update_on_drop,
        }
    }

    /// Create a fully specified transform and register it with `cell`,
    /// optionally recomputing right away.
    pub fn new(
        cell: &Derived<T>,
        func: impl Fn(&mut T) + 'static,
        priority: i32,
        enabled: bool,
        and_update: bool,
        update_on_drop: bool,
    ) -> Self {
        let transform = Transform::with(func, priority, enabled);
        cell.add_transform(&transform, and_update);
        Self {
            cell: Some(cell.clone()),
            transform,
            update_on_drop,
        }
    }

    /// Replace the transform's function, priority, and enabled state in
    /// place, optionally recomputing the bound cell.
    pub fn set(
        &self,
        func: impl Fn(&mut T) + 'static,
        priority: i32,
        enabled: bool,
        and_update: bool,
    ) {
        self.transform.set(func, priority, enabled);
        if and_update {
            if let Some(cell) = &self.cell {
                cell.recompute();
            }
        }
    }

    /// Choose whether dropping this wrapper forces a final recompute.
    pub fn set_update_on_drop(&mut self, update_on_drop: bool) {
        self.update_on_drop = update_on_drop;
    }

    /// Enable the transform, optionally recomputing the bound cell.
    pub fn enable(&self, and_update: bool) {
        self.transform.enable();
        if and_update {
            if let Some(cell) = &self.cell {
                cell.recompute();
            }
        }
    }

    /// Disable the transform, optionally recomputing the bound cell.
    pub fn disable(&self, and_update: bool) {
        self.transform.disable();
        if and_update {
            if let Some(cell) = &self.cell {
                cell.recompute();
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transform.is_enabled()
    }

    pub fn priority(&self) -> i32 {
        self.transform.priority()
    }

    /// Access the wrapped transform.
    pub fn transform(&self) -> &Transform<T> {
        &self.transform
    }

    /// Apply the wrapped transform to `value` in place.
    pub fn apply(&self, value: &mut T) {
        self.transform.apply(value);
    }
}

impl<T> Drop for ScopedTransform<T>
where
    T: Clone + PartialEq + 'static,
{
    fn drop(&mut self) {
        if let Some(cell) = &self.cell {
            cell.remove_transform(&self.transform, self.update_on_drop);
        }
    }
}

/// Binds one value-changed listener to a cell for this wrapper's lifetime.
pub struct ScopedValueListener<T>
where
    T: Clone + PartialEq + 'static,
{
    cell: Option<Derived<T>>,
    listener: Option<Listener<T>>,
}

impl<T> ScopedValueListener<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create an empty wrapper; nothing is registered until both a cell and
    /// a closure are supplied.
    pub fn unbound() -> Self {
        Self {
            cell: None,
            listener: None,
        }
    }

    /// Create a listener from `func` and register it with `cell`.
    pub fn new(cell: &Derived<T>, func: impl Fn(&Derived<T>, &T, &T) + 'static) -> Self {
        let wrapper = Self {
            cell: Some(cell.clone()),
            listener: Some(Listener::new(func)),
        };
        wrapper.attach();
        wrapper
    }

    /// Re-point the wrapper at a new cell and closure.
    pub fn set(&mut self, cell: &Derived<T>, func: impl Fn(&Derived<T>, &T, &T) + 'static) {
        self.detach();
        self.cell = Some(cell.clone());
        self.listener = Some(Listener::new(func));
        self.attach();
    }

    /// Re-point the wrapper at a new cell, keeping the current closure.
    pub fn set_cell(&mut self, cell: Option<&Derived<T>>) {
        self.detach();
        self.cell = cell.cloned();
        self.attach();
    }

    /// Replace the closure, keeping the current cell.
    pub fn set_func(&mut self, func: impl Fn(&Derived<T>, &T, &T) + 'static) {
        self.detach();
        self.listener = Some(Listener::new(func));
        self.attach();
    }

    fn attach(&self) {
        if let (Some(cell), Some(listener)) = (&self.cell, &self.listener) {
            cell.add_value_listener(listener);
        }
    }

    fn detach(&self) {
        if let (Some(cell), Some(listener)) = (&self.cell, &self.listener) {
            cell.remove_value_listener(listener);
        }
    }
}

impl<T> Default for ScopedValueListener<T>
where
    T: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::unbound()
    }
}

impl<T> Drop for ScopedValueListener<T>
where
    T: Clone + PartialEq + 'static,
{
    fn drop(&mut self) {
        self.detach();
    }
}

/// Binds one identity-changed listener to a cell for this wrapper's
/// lifetime. The identity-channel twin of [`ScopedValueListener`].
pub struct ScopedIdentityListener<T>
where
    T: Clone + PartialEq + 'static,
{
    cell: Option<Derived<T>>,
    listener: Option<Listener<T>>,
}

impl<T> ScopedIdentityListener<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create an empty wrapper; nothing is registered until both a cell and
    /// a closure are supplied.
    pub fn unbound() -> Self {
        Self {
            cell: None,
            listener: None,
        }
    }

    /// Create a listener from `func` and register it with `cell`.
    pub fn new(cell: &Derived<T>, func: impl Fn(&Derived<T>, &T, &T) + 'static) -> Self {
        let wrapper = Self {
            cell: Some(cell.clone()),
            listener: Some(Listener::new(func)),
        };
        wrapper.attach();
        wrapper
    }

    /// Re-point the wrapper at a new cell and closure.
    pub fn set(&mut self, cell: &Derived<T>, func: impl Fn(&Derived<T>, &T, &T) + 'static) {
        self.detach();
        self.cell = Some(cell.clone());
        self.listener = Some(Listener::new(func));
        self.attach();
    }

    /// Re-point the wrapper at a new cell, keeping the current closure.
    pub fn set_cell(&mut self, cell: Option<&Derived<T>>) {
        self.detach();
        self.cell = cell.cloned();
        self.attach();
    }

    /// Replace the closure, keeping the current cell.
    pub fn set_func(&mut self, func: impl Fn(&Derived<T>, &T, &T) + 'static) {
        self.detach();
        self.listener = Some(Listener::new(func));
        self.attach();
    }

    fn attach(&self) {
        if let (Some(cell), Some(listener)) = (&self.cell, &self.listener) {
            cell.add_identity_listener(listener);
        }
    }

    fn detach(&self) {
        if let (Some(cell), Some(listener)) = (&self.cell, &self.listener) {
            cell.remove_identity_listener(listener);
        }
    }
}

impl<T> Default for ScopedIdentityListener<T>
where
    T: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::unbound()
    }
}

impl<T> Drop for ScopedIdentityListener<T>
where
    T: Clone + PartialEq + 'static,
{
    fn drop(&mut self) {
        self.detach();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
