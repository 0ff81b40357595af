//! Stepper for discrete delay-difference equations.
//!
//! Advances a state vector through integer steps with a user-supplied update
//! rule:
//!
//! ```text
//! y[i+1] = f(i, t0 + dt * i, y[i], params)
//! ```
//!
//! while keeping a bounded [`History`] of past states so that `f` can look
//! back at earlier steps ("lagged values").
//!
//! # Lifecycle
//!
//! A [`SolveContext`] bundles the dimensions, update function, parameter
//! block and history. [`SolveContext::run`] steps through a schedule and
//! returns a [`Solution`]; the context can then be run again, inspected, or
//! released. [`SolveContext::run_once`] runs and releases in one call.
//!
//! # Lagged values
//!
//! Update functions receive a [`Lags`](difeq_core::Lags) handle. Inside a
//! run, the same queries are also available through the free functions in
//! [`lag`], which reach the solve active on the calling thread.
//!
//! # Example
//!
//! ```
//! use difeq_core::{LagError, Lags, Step, Update, from_fn};
//! use difeq_solvers::difference::{Config, SolveContext};
//!
//! // y[i+1] = y[i] + y[i-1], with y[-1] taken as 0.
//! let fibonacci = from_fn(|step: &Step<'_>, _: &(), lags: &dyn Lags| {
//!     let previous = match lags.lookup_one(step.index as i64 - 1, 0) {
//!         Ok(value) => value,
//!         Err(LagError::OutOfWindow { .. }) => 0.0,
//!         Err(err) => return Err(err),
//!     };
//!     Ok(Update::new(vec![step.state[0] + previous]))
//! });
//!
//! let context = SolveContext::new(1, 0, 2, fibonacci, ());
//! let solution = context
//!     .run_once(&[1.0], &[0, 1, 2, 3, 4, 5], &Config::default())
//!     .unwrap();
//!
//! let values: Vec<f64> = solution.states.row(0).to_vec();
//! assert_eq!(values, vec![1.0, 1.0, 2.0, 3.0, 5.0, 8.0]);
//! ```
//!
//! # Observer Events
//!
//! [`SolveContext::run_observed`] emits one [`Event`] after each
//! update-function call. Observers can return [`Action::StopEarly`] to end
//! the run with the rows completed so far.

mod action;
mod config;
mod context;
mod error;
mod event;
mod history;
pub mod lag;
mod solution;
mod stepper;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use config::{Config, ConfigError};
pub use context::{RunState, SolveContext};
pub use error::Error;
pub use event::Event;
pub use history::{History, HistoryError, HistoryMatrix};
pub use lag::LagView;
pub use solution::{Solution, Status};
