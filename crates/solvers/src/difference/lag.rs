//! Lagged-value queries against a running solve.
//!
//! Update functions receive a [`Lags`] handle directly, which is the
//! preferred way to look back at earlier states. For callers that cannot
//! thread that handle through (for example glue code several calls deep
//! inside an update function), the free functions in this module reach the
//! solve that is currently running on the calling thread:
//!
//! ```ignore
//! use difeq_solvers::difference::lag;
//!
//! let delayed = lag::lookup_one(step.index as i64 - 2, 0)?;
//! ```
//!
//! Outside a running solve every query reports [`LagError::NoActiveSolve`].

use std::cell::RefCell;
use std::rc::Rc;

use difeq_core::{LagError, Lags};

use super::history::{History, HistoryError};

/// The part of a solve context that lag queries can see.
///
/// The stepper is the only writer. It appends to `history` and sets
/// `current` before calling the update function, and holds no borrow while
/// the update function runs.
#[derive(Debug)]
pub(super) struct Frame {
    pub(super) history: History,
    pub(super) current: Option<usize>,
}

impl Frame {
    pub(super) fn new(history: History) -> Self {
        Self {
            history,
            current: None,
        }
    }
}

/// Read-only [`Lags`] view over a running solve.
#[derive(Debug, Clone, Copy)]
pub struct LagView<'a> {
    frame: &'a Frame,
}

impl<'a> LagView<'a> {
    pub(super) fn new(frame: &'a Frame) -> Self {
        Self { frame }
    }
}

impl Lags for LagView<'_> {
    fn dim(&self) -> usize {
        self.frame.history.stride()
    }

    fn current_step(&self) -> usize {
        debug_assert!(
            self.frame.current.is_some(),
            "lag view built over an inactive frame"
        );
        self.frame.current.unwrap_or_default()
    }

    fn state(&self, step: i64) -> Result<&[f64], LagError> {
        let Some(current) = self.frame.current else {
            return Err(LagError::NoActiveSolve);
        };
        if i128::from(step) > current as i128 {
            return Err(LagError::NotYetComputed { step, current });
        }

        let history = &self.frame.history;
        let (Some(oldest), Some(newest)) = (history.oldest_step(), history.newest_step()) else {
            return Err(LagError::EmptyHistory { step });
        };
        let out_of_window = LagError::OutOfWindow {
            step,
            oldest,
            newest,
        };

        let index = usize::try_from(step).map_err(|_| out_of_window)?;
        history.get(index).map_err(|err| match err {
            HistoryError::Empty => LagError::EmptyHistory { step },
            HistoryError::OutOfWindow { .. } | HistoryError::DestinationLength { .. } => {
                out_of_window
            }
        })
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<Rc<RefCell<Frame>>>> = const { RefCell::new(None) };
}

/// Registers a frame as the calling thread's active solve until dropped.
///
/// Dropping restores whatever was active before, so nested solves on one
/// thread never leave the outer solve pointing at the inner one's history.
pub(super) struct Activation {
    previous: Option<Rc<RefCell<Frame>>>,
}

impl Activation {
    pub(super) fn install(frame: Rc<RefCell<Frame>>) -> Self {
        let previous = ACTIVE.with(|slot| slot.replace(Some(frame)));
        Self { previous }
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The slot is already gone during thread teardown; nothing to restore.
        let _ = ACTIVE.try_with(|slot| {
            *slot.borrow_mut() = previous;
        });
    }
}

/// Runs `query` against the solve that is active on the calling thread.
///
/// # Errors
///
/// Returns [`LagError::NoActiveSolve`] if no solve is running, or whatever
/// error `query` returns.
pub fn with_active<R>(
    query: impl FnOnce(&dyn Lags) -> Result<R, LagError>,
) -> Result<R, LagError> {
    let frame = ACTIVE
        .with(|slot| slot.borrow().clone())
        .ok_or(LagError::NoActiveSolve)?;
    let frame = frame.try_borrow().map_err(|_| LagError::NoActiveSolve)?;
    if frame.current.is_none() {
        return Err(LagError::NoActiveSolve);
    }
    query(&LagView::new(&frame))
}

/// Returns `true` if a solve is running on the calling thread.
#[must_use]
pub fn is_active() -> bool {
    ACTIVE.with(|slot| {
        slot.borrow()
            .as_ref()
            .is_some_and(|frame| frame.try_borrow().is_ok_and(|f| f.current.is_some()))
    })
}

/// Returns one component of the state recorded at `step` in the active solve.
///
/// # Errors
///
/// See [`Lags::lookup_one`]; also [`LagError::NoActiveSolve`].
pub fn lookup_one(step: i64, component: usize) -> Result<f64, LagError> {
    with_active(|lags| lags.lookup_one(step, component))
}

/// Returns the full state recorded at `step` in the active solve.
///
/// # Errors
///
/// See [`Lags::lookup_all`]; also [`LagError::NoActiveSolve`].
pub fn lookup_all(step: i64) -> Result<Vec<f64>, LagError> {
    with_active(|lags| lags.lookup_all(step))
}

/// Gathers components of the state recorded at `step` in the active solve.
///
/// # Errors
///
/// See [`Lags::lookup_many`]; also [`LagError::NoActiveSolve`].
pub fn lookup_many(step: i64, components: &[usize]) -> Result<Vec<f64>, LagError> {
    with_active(|lags| lags.lookup_many(step, components))
}
