//! Observers that end a run early.

use difeq_core::Observer;
use tracing::{debug, warn};

use crate::traits::{CanStopEarly, HasState, HasStep};

/// Stops a run the first time a predicate on the produced state holds.
///
/// # Example
///
/// ```ignore
/// let above = StopWhen::new(|state: &[f64]| state[0] > 100.0);
/// context.run_observed(&initial, &schedule, &config, above)?;
/// ```
pub struct StopWhen<F> {
    predicate: F,
    triggered_at: Option<usize>,
}

impl<F> StopWhen<F>
where
    F: FnMut(&[f64]) -> bool,
{
    /// Creates an observer that stops once `predicate` returns `true`.
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            triggered_at: None,
        }
    }

    /// Returns the step at which the predicate first held.
    #[must_use]
    pub fn triggered_at(&self) -> Option<usize> {
        self.triggered_at
    }
}

impl<F, E, A> Observer<E, A> for StopWhen<F>
where
    F: FnMut(&[f64]) -> bool,
    E: HasStep + HasState,
    A: CanStopEarly,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        if !(self.predicate)(event.state()) {
            return None;
        }
        debug!(step = event.step(), "stop condition met");
        self.triggered_at.get_or_insert(event.step());
        Some(A::stop_early())
    }
}

/// Allows `&mut StopWhen` to be passed so the caller can read
/// [`triggered_at`](StopWhen::triggered_at) afterwards.
impl<F, E, A> Observer<E, A> for &mut StopWhen<F>
where
    F: FnMut(&[f64]) -> bool,
    E: HasStep + HasState,
    A: CanStopEarly,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        (**self).observe(event)
    }
}

/// Stops a run as soon as a step produces a NaN or infinite component.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonFinite {
    found_at: Option<usize>,
}

impl NonFinite {
    /// Creates the observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the step whose update produced the first non-finite value.
    #[must_use]
    pub fn found_at(&self) -> Option<usize> {
        self.found_at
    }
}

impl<E, A> Observer<E, A> for NonFinite
where
    E: HasStep + HasState,
    A: CanStopEarly,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        let component = event.state().iter().position(|y| !y.is_finite())?;
        warn!(
            step = event.step(),
            component, "update produced a non-finite value"
        );
        self.found_at.get_or_insert(event.step());
        Some(A::stop_early())
    }
}

impl<E, A> Observer<E, A> for &mut NonFinite
where
    E: HasStep + HasState,
    A: CanStopEarly,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        (**self).observe(event)
    }
}
