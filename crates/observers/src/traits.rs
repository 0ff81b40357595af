//! Capability traits for generic observers.
//!
//! These traits abstract over event and action types, so an observer can be
//! written once and used with any solver whose events expose a step and a
//! state.
//!
//! # Event traits
//!
//! - [`HasStep`]: events tagged with a step index
//! - [`HasState`]: events that carry the state produced by the step
//!
//! # Action traits
//!
//! - [`CanStopEarly`]: actions that can signal early termination
//!
//! # Example
//!
//! ```rust
//! use difeq_core::Observer;
//! use difeq_observers::traits::{CanStopEarly, HasStep};
//!
//! struct StopAfter {
//!     last: usize,
//! }
//!
//! impl<E: HasStep, A: CanStopEarly> Observer<E, A> for StopAfter {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.step() >= self.last).then(A::stop_early)
//!     }
//! }
//! ```

use difeq_solvers::difference;

/// An event tagged with a step index.
pub trait HasStep {
    /// Returns the step index the event was produced at.
    fn step(&self) -> usize;

    /// Returns the time at that step.
    fn t(&self) -> f64;
}

/// An event that carries the state produced by a step.
pub trait HasState {
    /// Returns the newly produced state.
    fn state(&self) -> &[f64];
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

// --- difference::Event ---

impl HasStep for difference::Event<'_> {
    fn step(&self) -> usize {
        self.step
    }

    fn t(&self) -> f64 {
        self.t
    }
}

impl HasState for difference::Event<'_> {
    fn state(&self) -> &[f64] {
        self.next
    }
}

// --- CanStopEarly impls ---

impl CanStopEarly for difference::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
