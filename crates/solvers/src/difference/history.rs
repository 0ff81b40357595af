use ndarray::Array2;
use thiserror::Error;

/// Errors that can occur when reading from a [`History`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history is empty")]
    Empty,

    #[error("step {step} is outside the retained window [{oldest}, {newest}]")]
    OutOfWindow {
        step: usize,
        oldest: usize,
        newest: usize,
    },

    #[error("destination holds {received} values but {expected} are retained")]
    DestinationLength { expected: usize, received: usize },
}

/// A fixed-capacity ring buffer of state vectors.
///
/// States are tagged by the order in which they were appended: the first
/// append is step `origin`, the next `origin + 1`, and so on. Once `capacity`
/// states are retained, each append evicts the oldest one, so the history is
/// a sliding window over the most recent `capacity` steps.
///
/// A capacity of zero disables retention entirely.
#[derive(Debug, Clone)]
pub struct History {
    values: Vec<f64>,
    stride: usize,
    capacity: usize,
    used: usize,
    head: usize,
    origin: usize,
    appended: usize,
}

impl History {
    /// Creates an empty history retaining up to `capacity` states of length
    /// `stride`, starting at step 0.
    #[must_use]
    pub fn new(capacity: usize, stride: usize) -> Self {
        Self::with_origin(capacity, stride, 0)
    }

    /// Creates an empty history whose first append is recorded as `origin`.
    #[must_use]
    pub fn with_origin(capacity: usize, stride: usize, origin: usize) -> Self {
        Self {
            values: Vec::new(),
            stride,
            capacity,
            used: 0,
            head: 0,
            origin,
            appended: 0,
        }
    }

    /// Returns the maximum number of retained states.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the length of each stored state.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the number of states currently retained.
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.used
    }

    /// Returns `true` if no states are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Returns the step of the oldest retained state.
    #[must_use]
    pub fn oldest_step(&self) -> Option<usize> {
        (self.used > 0).then(|| self.origin + (self.appended - self.used))
    }

    /// Returns the step of the most recently appended state.
    #[must_use]
    pub fn newest_step(&self) -> Option<usize> {
        (self.used > 0).then(|| self.origin + (self.appended - 1))
    }

    /// Copies `state` into the next slot, evicting the oldest state when full.
    ///
    /// # Panics
    ///
    /// Panics if `state.len()` differs from the history's stride.
    pub fn append(&mut self, state: &[f64]) {
        assert_eq!(
            state.len(),
            self.stride,
            "state length must match the history stride"
        );

        self.appended += 1;
        if self.capacity == 0 {
            return;
        }

        if self.used < self.capacity {
            self.values.extend_from_slice(state);
            self.used += 1;
        } else {
            let start = self.head * self.stride;
            self.values[start..start + self.stride].copy_from_slice(state);
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Returns the state recorded at `step`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Empty`] if nothing is retained, or
    /// [`HistoryError::OutOfWindow`] if `step` is older than the oldest or
    /// newer than the newest retained state.
    pub fn get(&self, step: usize) -> Result<&[f64], HistoryError> {
        let (Some(oldest), Some(newest)) = (self.oldest_step(), self.newest_step()) else {
            return Err(HistoryError::Empty);
        };
        if step < oldest || step > newest {
            return Err(HistoryError::OutOfWindow {
                step,
                oldest,
                newest,
            });
        }
        Ok(self.slot(step - oldest))
    }

    /// Iterates over the retained states, oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        (0..self.used).map(|k| self.slot(k))
    }

    /// Copies every retained state, oldest first, into `destination`.
    ///
    /// The history is left unchanged, so the export can be repeated.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::DestinationLength`] unless `destination` holds
    /// exactly `stride * used_count()` values.
    pub fn drain_copy(&self, destination: &mut [f64]) -> Result<(), HistoryError> {
        let expected = self.stride * self.used;
        if destination.len() != expected {
            return Err(HistoryError::DestinationLength {
                expected,
                received: destination.len(),
            });
        }
        if self.stride == 0 {
            return Ok(());
        }

        for (chunk, state) in destination.chunks_exact_mut(self.stride).zip(self.iter()) {
            chunk.copy_from_slice(state);
        }
        Ok(())
    }

    /// Returns the retained states, oldest first, as one flat vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.stride * self.used);
        for state in self.iter() {
            flat.extend_from_slice(state);
        }
        flat
    }

    /// Returns the retained states as a [`HistoryMatrix`].
    #[must_use]
    pub fn export(&self) -> HistoryMatrix {
        HistoryMatrix {
            n: self.stride,
            first_step: self.oldest_step().unwrap_or(self.origin),
            values: columns(&self.to_vec(), self.stride, self.used),
        }
    }

    /// Discards every retained state and restarts step numbering at `origin`.
    pub fn clear(&mut self, origin: usize) {
        self.values.clear();
        self.used = 0;
        self.head = 0;
        self.appended = 0;
        self.origin = origin;
    }

    /// Logical slot `k`, where slot 0 is the oldest retained state.
    fn slot(&self, k: usize) -> &[f64] {
        let physical = (self.head + k) % self.capacity;
        let start = physical * self.stride;
        &self.values[start..start + self.stride]
    }
}

/// A drained copy of a [`History`], one column per retained step.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryMatrix {
    n: usize,
    first_step: usize,
    values: Array2<f64>,
}

impl HistoryMatrix {
    /// Returns the state dimension (the number of rows).
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns the step recorded in the first column.
    #[must_use]
    pub fn first_step(&self) -> usize {
        self.first_step
    }

    /// Returns the number of retained steps (the number of columns).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.ncols()
    }

    /// Returns `true` if no steps were retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `n × len` matrix of retained states.
    #[must_use]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Consumes the matrix and returns its values.
    #[must_use]
    pub fn into_values(self) -> Array2<f64> {
        self.values
    }
}

/// Lays out `count` consecutive vectors of length `width` as matrix columns.
pub(super) fn columns(flat: &[f64], width: usize, count: usize) -> Array2<f64> {
    Array2::from_shape_fn((width, count), |(row, col)| flat[col * width + row])
}
