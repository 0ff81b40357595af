//! Steppers for discrete delay-difference equations.
//!
//! See [`difference`] for the stepper, its history, and lagged-value queries.

pub mod difference;
