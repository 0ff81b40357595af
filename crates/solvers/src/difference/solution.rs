use ndarray::{Array2, ArrayView1};

use super::HistoryMatrix;

/// Indicates how the stepper terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// Reached the last scheduled step.
    Complete,

    /// Stopped early due to an observer action.
    StoppedByObserver,
}

/// The result of a difference solve.
///
/// Matrices hold one column per output row, so `states` is `n × rows` and
/// `outputs` is `n_out × rows`.
#[derive(Debug, Clone)]
pub struct Solution {
    /// How the stepper terminated.
    pub status: Status,

    /// The step index of each output row.
    pub steps: Vec<usize>,

    /// The state at each output row.
    pub states: Array2<f64>,

    /// Auxiliary output at each output row, when configured.
    pub outputs: Option<Array2<f64>>,

    /// Drained copy of the retained history, when requested.
    pub history: Option<HistoryMatrix>,

    /// Number of update-function calls made.
    pub evaluations: usize,
}

impl Solution {
    /// Returns the number of output rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.steps.len()
    }

    /// Returns the state at output row `row`.
    #[must_use]
    pub fn state(&self, row: usize) -> Option<ArrayView1<'_, f64>> {
        (row < self.rows()).then(|| self.states.column(row))
    }

    /// Returns the auxiliary output at output row `row`.
    #[must_use]
    pub fn output(&self, row: usize) -> Option<ArrayView1<'_, f64>> {
        let outputs = self.outputs.as_ref()?;
        (row < self.rows()).then(|| outputs.column(row))
    }

    /// Returns the last output row's state.
    #[must_use]
    pub fn last_state(&self) -> Option<ArrayView1<'_, f64>> {
        self.rows().checked_sub(1).and_then(|row| self.state(row))
    }
}
