//! Refract Core
//!
//! This crate provides prioritized derived-value primitives: an identity
//! value is combined, on demand, with an ordered stack of transformation
//! functions to produce a cached derived value, with change notification to
//! interested listeners.
//!
//! Independent producers — game effects, modifiers, policies — can influence
//! a shared value without depending on each other. A movement debuff and a
//! speed boost both register transforms against the same cell; who wins is
//! decided by priority, not by an if-ladder that knows about both.
//!
//! # Architecture
//!
//! The crate is organized around one module:
//!
//! - `derived`: transforms, derived cells, change listeners, and the scoped
//!   wrappers that bind their lifetimes together
//!
//! # Example
//!
//! ```
//! use refract_core::derived::{Derived, Transform};
//!
//! // A creature's speed, before anything acts on it.
//! let speed = Derived::new(5.0_f64);
//!
//! let mud_trap = Transform::new(|v: &mut f64| *v -= 1.0);
//! let power_pill = Transform::with(|v: &mut f64| *v *= 1.5, 1, true);
//!
//! speed.add_transform(&mud_trap, true);
//! assert_eq!(speed.get(), 4.0);
//!
//! // The pill outranks the trap, so it multiplies first: 5 * 1.5 - 1.
//! speed.add_transform(&power_pill, true);
//! assert_eq!(speed.get(), 6.5);
//! ```

pub mod derived;
