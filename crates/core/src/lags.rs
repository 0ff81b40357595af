use thiserror::Error;

/// Errors reported by lagged-value queries.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LagError {
    #[error("lagged values are only available while a solve is running")]
    NoActiveSolve,

    #[error("step {step} is not retained: the history is empty")]
    EmptyHistory { step: i64 },

    #[error("step {step} is outside the retained history window [{oldest}, {newest}]")]
    OutOfWindow {
        step: i64,
        oldest: usize,
        newest: usize,
    },

    #[error("step {step} has not been computed yet (current step is {current})")]
    NotYetComputed { step: i64, current: usize },

    #[error("component index {index} is out of range for a state of length {n}")]
    ComponentOutOfRange { index: usize, n: usize },
}

/// Read-only access to states computed earlier in a running solve.
///
/// While an update function computes `y[i+1]` from `y[i]`, every retained
/// step up to and including `i` can be looked up. Steps are absolute indices;
/// negative values are accepted so that expressions like `step - delay` can be
/// passed through directly and reported as out of the retained window.
///
/// Implementors only provide [`state`](Lags::state); the component lookups
/// are built on top of it.
pub trait Lags {
    /// Returns the dimension of each stored state.
    fn dim(&self) -> usize;

    /// Returns the step currently being advanced.
    fn current_step(&self) -> usize;

    /// Returns the full state recorded at `step`.
    ///
    /// # Errors
    ///
    /// Returns a [`LagError`] if `step` is not in the retained window or has
    /// not been computed yet.
    fn state(&self, step: i64) -> Result<&[f64], LagError>;

    /// Returns a single component of the state recorded at `step`.
    ///
    /// # Errors
    ///
    /// Returns a [`LagError`] if the step cannot be looked up or `component`
    /// is not a valid index.
    fn lookup_one(&self, step: i64, component: usize) -> Result<f64, LagError> {
        let state = self.state(step)?;
        state
            .get(component)
            .copied()
            .ok_or(LagError::ComponentOutOfRange {
                index: component,
                n: state.len(),
            })
    }

    /// Returns a copy of the full state recorded at `step`.
    ///
    /// # Errors
    ///
    /// Returns a [`LagError`] if the step cannot be looked up.
    fn lookup_all(&self, step: i64) -> Result<Vec<f64>, LagError> {
        self.state(step).map(<[f64]>::to_vec)
    }

    /// Gathers the requested components of the state recorded at `step`.
    ///
    /// The result follows the order of `components`, which need not be sorted
    /// or unique.
    ///
    /// # Errors
    ///
    /// Returns a [`LagError`] if the step cannot be looked up or any index in
    /// `components` is out of range.
    fn lookup_many(&self, step: i64, components: &[usize]) -> Result<Vec<f64>, LagError> {
        let state = self.state(step)?;
        components
            .iter()
            .map(|&index| {
                state
                    .get(index)
                    .copied()
                    .ok_or(LagError::ComponentOutOfRange {
                        index,
                        n: state.len(),
                    })
            })
            .collect()
    }
}
