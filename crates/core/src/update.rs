use std::error::Error as StdError;

use crate::Lags;

/// The arguments of a single update-function call.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    /// The step index of `state`.
    pub index: usize,

    /// The time at this step, `t0 + dt * index`.
    pub t: f64,

    /// The state being advanced.
    pub state: &'a [f64],
}

/// The result of a single update-function call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// The next state, which must have the same length as the current one.
    pub state: Vec<f64>,

    /// Auxiliary values recorded alongside the state but not fed back into
    /// the recurrence.
    pub output: Option<Vec<f64>>,
}

impl Update {
    /// Creates an update with a next state and no auxiliary output.
    #[must_use]
    pub fn new(state: Vec<f64>) -> Self {
        Self {
            state,
            output: None,
        }
    }

    /// Attaches auxiliary output to the update.
    #[must_use]
    pub fn with_output(mut self, output: Vec<f64>) -> Self {
        self.output = Some(output);
        self
    }
}

impl From<Vec<f64>> for Update {
    fn from(state: Vec<f64>) -> Self {
        Self::new(state)
    }
}

/// A discrete update rule `y[i+1] = f(i, t, y[i], params)`.
///
/// The parameter block `P` is owned by the caller and passed through
/// untouched; the stepper never interprets it. `lags` gives read access to
/// states computed earlier in the same solve.
///
/// Update functions should be deterministic: the stepper calls them exactly
/// once per step boundary and never retries.
pub trait UpdateFn<P: ?Sized> {
    type Error: StdError + Send + Sync + 'static;

    /// Computes the next state (and any auxiliary output) from `step`.
    ///
    /// # Errors
    ///
    /// Each update function defines its own `Error` type. Returning an error
    /// aborts the solve.
    fn update(&self, step: &Step<'_>, params: &P, lags: &dyn Lags)
    -> Result<Update, Self::Error>;
}

impl<P: ?Sized, U: UpdateFn<P> + ?Sized> UpdateFn<P> for &U {
    type Error = U::Error;

    fn update(
        &self,
        step: &Step<'_>,
        params: &P,
        lags: &dyn Lags,
    ) -> Result<Update, Self::Error> {
        (**self).update(step, params, lags)
    }
}

/// An [`UpdateFn`] backed by a closure.
///
/// Created with [`from_fn`].
#[derive(Clone, Copy)]
pub struct FromFn<F>(F);

impl<F> std::fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

/// Wraps a closure as an [`UpdateFn`].
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
///
/// use difeq_core::{Lags, Step, Update, UpdateFn, from_fn};
///
/// let increment = from_fn(|step: &Step<'_>, _: &(), _: &dyn Lags| {
///     Ok::<_, Infallible>(Update::new(step.state.iter().map(|y| y + 1.0).collect()))
/// });
/// # let _ = &increment;
/// ```
pub fn from_fn<P, E, F>(f: F) -> FromFn<F>
where
    P: ?Sized,
    E: StdError + Send + Sync + 'static,
    F: Fn(&Step<'_>, &P, &dyn Lags) -> Result<Update, E>,
{
    FromFn(f)
}

impl<P, E, F> UpdateFn<P> for FromFn<F>
where
    P: ?Sized,
    E: StdError + Send + Sync + 'static,
    F: Fn(&Step<'_>, &P, &dyn Lags) -> Result<Update, E>,
{
    type Error = E;

    fn update(&self, step: &Step<'_>, params: &P, lags: &dyn Lags) -> Result<Update, E> {
        (self.0)(step, params, lags)
    }
}
