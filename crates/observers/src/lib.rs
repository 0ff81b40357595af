//! Reusable observers for the difeq stepper.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work with any event carrying a step and a state.
//!
//! # Modules
//!
//! - [`traits`]: Capability traits for generic observers
//!   ([`HasStep`], [`HasState`], [`CanStopEarly`])
//! - [`stop`]: Observers that end a run early ([`StopWhen`], [`NonFinite`])
//! - [`trace`]: An observer that records the trajectory ([`Tracer`])
//!
//! [`Observer`]: difeq_core::Observer
//! [`HasStep`]: traits::HasStep
//! [`HasState`]: traits::HasState
//! [`CanStopEarly`]: traits::CanStopEarly
//! [`StopWhen`]: stop::StopWhen
//! [`NonFinite`]: stop::NonFinite
//! [`Tracer`]: trace::Tracer

pub mod stop;
pub mod trace;
pub mod traits;

pub use stop::{NonFinite, StopWhen};
pub use trace::Tracer;
