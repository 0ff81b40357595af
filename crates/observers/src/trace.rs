//! An observer that records the trajectory of a run.

use difeq_core::Observer;
use tracing::trace;

use crate::traits::{HasState, HasStep};

/// Records `(step, t, state)` for every event, and emits a `tracing` event
/// for each one.
///
/// Unlike the solution's output rows, which only cover scheduled steps, the
/// tracer sees every step boundary.
#[derive(Debug, Default, Clone)]
pub struct Tracer {
    steps: Vec<usize>,
    times: Vec<f64>,
    states: Vec<Vec<f64>>,
}

impl Tracer {
    /// Creates an empty tracer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the recorded step indices.
    #[must_use]
    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    /// Returns the recorded times.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Returns the recorded states.
    #[must_use]
    pub fn states(&self) -> &[Vec<f64>] {
        &self.states
    }

    /// Returns the recorded values of one state component.
    ///
    /// States too short to have `component` are skipped.
    #[must_use]
    pub fn component(&self, component: usize) -> Vec<f64> {
        self.states
            .iter()
            .filter_map(|state| state.get(component).copied())
            .collect()
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.steps.clear();
        self.times.clear();
        self.states.clear();
    }
}

impl<E, A> Observer<E, A> for Tracer
where
    E: HasStep + HasState,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        trace!(step = event.step(), t = event.t(), state = ?event.state(), "step");
        self.steps.push(event.step());
        self.times.push(event.t());
        self.states.push(event.state().to_vec());
        None
    }
}

/// Allows `&mut Tracer` to be passed so the caller keeps the recording.
impl<E, A> Observer<E, A> for &mut Tracer
where
    E: HasStep + HasState,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        (**self).observe(event)
    }
}
