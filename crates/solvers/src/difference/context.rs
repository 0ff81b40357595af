use std::cell::{Ref, RefCell};
use std::rc::Rc;

use difeq_core::{Observer, UpdateFn};
use tracing::{debug, warn};

use super::history::{History, HistoryMatrix};
use super::lag::{Activation, Frame};
use super::stepper::{self, Request};
use super::{Action, Config, Error, Event, Solution};

/// Where a [`SolveContext`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Created but not yet run.
    Idle,

    /// A run is in progress.
    Running,

    /// The last run reached its final step or was stopped by its observer.
    Completed,

    /// The last run failed.
    Failed,
}

/// The state of a difference solve: dimensions, update function, parameter
/// block, and history.
///
/// A context is created idle, can be run any number of times (each run
/// starts from a cleared history), and is released either explicitly with
/// [`release`](Self::release) or when dropped. Release is idempotent.
///
/// While [`run`](Self::run) is executing, the context is the calling
/// thread's active solve, so the free functions in [`lag`](super::lag) can
/// reach its history from inside the update function.
///
/// A context is not `Send`: its history is shared with the thread's
/// active-solve slot while it runs.
pub struct SolveContext<U, P> {
    update: U,
    params: P,
    n: usize,
    n_out: usize,
    history_capacity: usize,
    frame: Option<Rc<RefCell<Frame>>>,
    state: RunState,
}

impl<U, P> SolveContext<U, P> {
    /// Creates an idle context for states of length `n`.
    ///
    /// `n_out` is the length of the auxiliary output the update function must
    /// produce at every step (0 disables it) and `history_capacity` is the
    /// number of past states kept for lag queries (0 disables history).
    pub fn new(n: usize, n_out: usize, history_capacity: usize, update: U, params: P) -> Self {
        let history = History::new(history_capacity, n);
        Self {
            update,
            params,
            n,
            n_out,
            history_capacity,
            frame: Some(Rc::new(RefCell::new(Frame::new(history)))),
            state: RunState::Idle,
        }
    }

    /// Returns the state dimension.
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns the auxiliary output dimension.
    #[must_use]
    pub fn n_out(&self) -> usize {
        self.n_out
    }

    /// Returns the maximum number of retained states.
    #[must_use]
    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    /// Returns where the context is in its lifecycle.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Returns `true` once [`release`](Self::release) has been called.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.frame.is_none()
    }

    /// Returns the update function.
    pub fn update_fn(&self) -> &U {
        &self.update
    }

    /// Returns the parameter block.
    pub fn params(&self) -> &P {
        &self.params
    }

    /// Returns the parameter block mutably, for adjusting it between runs.
    pub fn params_mut(&mut self) -> &mut P {
        &mut self.params
    }

    /// Borrows the history retained by the last run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Released`] if the context has been released.
    pub fn history(&self) -> Result<Ref<'_, History>, Error> {
        let frame = self.frame.as_ref().ok_or(Error::Released)?;
        Ok(Ref::map(frame.borrow(), |frame| &frame.history))
    }

    /// Returns a drained copy of the history retained by the last run.
    ///
    /// The history itself is left intact, so this can be called repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Released`] if the context has been released.
    pub fn take_history(&self) -> Result<HistoryMatrix, Error> {
        Ok(self.history()?.export())
    }

    /// Frees the history and makes the context unusable.
    ///
    /// Safe to call any number of times, including after a failed run.
    pub fn release(&mut self) {
        if self.frame.take().is_some() {
            debug!(n = self.n, "released solve context");
        }
    }
}

impl<U, P> SolveContext<U, P>
where
    U: UpdateFn<P>,
{
    /// Steps from `schedule[0]` to the last scheduled step.
    ///
    /// `initial` is the state at `schedule[0]`. An output row is written for
    /// every entry of `schedule` (except the first, unless the config
    /// includes the initial condition).
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are invalid, the update function fails
    /// or breaks its output contract, or the context has been released. The
    /// context stays releasable in every case.
    pub fn run(
        &mut self,
        initial: &[f64],
        schedule: &[usize],
        config: &Config,
    ) -> Result<Solution, Error> {
        self.run_observed(initial, schedule, config, ())
    }

    /// Like [`run`](Self::run), emitting an [`Event`] after each update that
    /// advances the state.
    ///
    /// The observer may return [`Action::StopEarly`] to end the run with the
    /// rows completed so far.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_observed<Obs>(
        &mut self,
        initial: &[f64],
        schedule: &[usize],
        config: &Config,
        observer: Obs,
    ) -> Result<Solution, Error>
    where
        Obs: for<'a> Observer<Event<'a>, Action>,
    {
        let frame = Rc::clone(self.frame.as_ref().ok_or(Error::Released)?);
        self.validate(initial, schedule)?;

        debug!(
            n = self.n,
            n_out = self.n_out,
            first = schedule[0],
            last = schedule[schedule.len() - 1],
            "starting difference solve"
        );

        let result = {
            let mut running = Running::start(&frame, &mut self.state);
            let _active = Activation::install(Rc::clone(&frame));
            let result = stepper::run(
                &frame,
                &self.update,
                &self.params,
                self.n_out,
                Request {
                    initial,
                    schedule,
                    config,
                },
                observer,
            );
            running.finish(result.is_ok());
            result
        };

        match &result {
            Ok(solution) => {
                debug!(
                    rows = solution.rows(),
                    evaluations = solution.evaluations,
                    status = ?solution.status,
                    "difference solve finished"
                );
            }
            Err(err) => {
                warn!(error = %err, "difference solve failed");
            }
        }
        result
    }

    /// Runs once and releases the context on every exit path.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_once(
        mut self,
        initial: &[f64],
        schedule: &[usize],
        config: &Config,
    ) -> Result<Solution, Error> {
        let result = self.run(initial, schedule, config);
        self.release();
        result
    }

    /// Like [`run_once`](Self::run_once), with an observer.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_once_observed<Obs>(
        mut self,
        initial: &[f64],
        schedule: &[usize],
        config: &Config,
        observer: Obs,
    ) -> Result<Solution, Error>
    where
        Obs: for<'a> Observer<Event<'a>, Action>,
    {
        let result = self.run_observed(initial, schedule, config, observer);
        self.release();
        result
    }

    fn validate(&self, initial: &[f64], schedule: &[usize]) -> Result<(), Error> {
        if schedule.is_empty() {
            return Err(Error::EmptySchedule);
        }
        if let Some(position) = schedule.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(Error::UnorderedSchedule {
                position: position + 1,
                previous: schedule[position],
                next: schedule[position + 1],
            });
        }
        let last = schedule[schedule.len() - 1];
        if last == usize::MAX {
            return Err(Error::StepOverflow { step: last });
        }
        if initial.len() != self.n {
            return Err(Error::InitialLength {
                expected: self.n,
                received: initial.len(),
            });
        }
        Ok(())
    }
}

/// Marks a context as running until dropped.
///
/// Dropping clears the frame's current step and, unless
/// [`finish`](Self::finish) recorded an outcome, marks the run as failed.
/// This covers a panic unwinding out of the update function.
struct Running<'a> {
    frame: &'a RefCell<Frame>,
    state: &'a mut RunState,
}

impl<'a> Running<'a> {
    fn start(frame: &'a RefCell<Frame>, state: &'a mut RunState) -> Self {
        *state = RunState::Running;
        Self { frame, state }
    }

    fn finish(&mut self, succeeded: bool) {
        *self.state = if succeeded {
            RunState::Completed
        } else {
            RunState::Failed
        };
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        if *self.state == RunState::Running {
            *self.state = RunState::Failed;
        }
        if let Ok(mut frame) = self.frame.try_borrow_mut() {
            frame.current = None;
        }
    }
}

impl<U, P> Drop for SolveContext<U, P> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<U, P> std::fmt::Debug for SolveContext<U, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolveContext")
            .field("n", &self.n)
            .field("n_out", &self.n_out)
            .field("history_capacity", &self.history_capacity)
            .field("state", &self.state)
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}
