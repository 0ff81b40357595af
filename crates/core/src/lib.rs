//! Core traits and types for stepping delay-difference equations.
//!
//! This crate defines the shared abstractions that the stepper, its lag
//! queries, and observers build on:
//!
//! - [`UpdateFn`]: the discrete update rule `y[i+1] = f(i, t, y[i], params)`
//! - [`Step`] and [`Update`]: what an update function receives and returns
//! - [`Lags`]: read-only access to previously computed states
//! - [`Observer`]: receives solver events and optionally returns control actions

mod lags;
mod observer;
mod update;

pub use lags::{LagError, Lags};
pub use observer::Observer;
pub use update::{FromFn, Step, Update, UpdateFn, from_fn};
