use std::cell::RefCell;

use difeq_core::{Observer, Step, Update, UpdateFn};
use tracing::{debug, trace};

use super::history::columns;
use super::lag::{Frame, LagView};
use super::{Action, Config, Error, Event, Solution, Status};

/// The caller-supplied inputs of one run.
#[derive(Debug, Clone, Copy)]
pub(super) struct Request<'a> {
    pub(super) initial: &'a [f64],
    pub(super) schedule: &'a [usize],
    pub(super) config: &'a Config,
}

/// Steps from `schedule[0]` to the last scheduled step.
///
/// # Algorithm
///
/// 1. Clear the history and store the initial state (unless the config opts
///    out of retaining it).
/// 2. At each step `i`:
///    - Write an output row for every scheduled occurrence of `i`.
///    - Set the frame's current step to `i`, then call the update function
///      with `y[i]` and a [`LagView`] over the frame.
///    - Check the returned state and auxiliary output against `n` and `n_out`.
///    - Give the auxiliary output to the rows written for `i`.
///    - Emit an [`Event`]; stop if the observer returns `StopEarly`.
///    - Append `y[i+1]` to the history and make it current.
/// 3. Stop at the last scheduled step. Auxiliary output belongs to the state
///    it was computed from, so when `n_out > 0` the last step is evaluated
///    once more to fill its row. That evaluation emits no event and its
///    resulting state is discarded.
///
/// The frame is never mutably borrowed while the update function runs, so
/// lag queries made from inside it (directly or through the thread's active
/// solve) always succeed in borrowing the history.
///
/// # Errors
///
/// Returns an error as soon as the update function fails or breaks its
/// output contract. The frame is left as it was at that point.
pub(super) fn run<U, P, Obs>(
    frame: &RefCell<Frame>,
    update: &U,
    params: &P,
    n_out: usize,
    request: Request<'_>,
    mut observer: Obs,
) -> Result<Solution, Error>
where
    U: UpdateFn<P> + ?Sized,
    P: ?Sized,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let Request {
        initial,
        schedule,
        config,
    } = request;
    let n = initial.len();
    let (Some(&first), Some(&last)) = (schedule.first(), schedule.last()) else {
        return Err(Error::EmptySchedule);
    };
    let rows = if config.includes_initial() {
        schedule
    } else {
        &schedule[1..]
    };

    {
        let mut frame = frame.borrow_mut();
        frame.current = None;
        if config.retains_initial() {
            frame.history.clear(first);
            frame.history.append(initial);
        } else {
            frame.history.clear(first + 1);
        }
    }

    let mut states = Vec::with_capacity(rows.len() * n);
    let mut outputs = Vec::with_capacity(rows.len() * n_out);
    let mut filled = 0;
    let mut awaiting_output = 0;
    let mut evaluations = 0;

    let mut current = initial.to_vec();
    let mut index = first;

    let status = loop {
        while filled < rows.len() && rows[filled] == index {
            states.extend_from_slice(&current);
            filled += 1;
            awaiting_output += 1;
        }
        if index == last && (n_out == 0 || awaiting_output == 0) {
            break Status::Complete;
        }

        let t = config.time_at(index);
        frame.borrow_mut().current = Some(index);
        trace!(step = index, t, "calling update function");

        let next = {
            let frame = frame.borrow();
            let step = Step {
                index,
                t,
                state: &current,
            };
            update
                .update(&step, params, &LagView::new(&frame))
                .map_err(|err| Error::update(index, err))?
        };
        evaluations += 1;

        let output = checked_output(&next, index, n, n_out)?;
        for _ in 0..awaiting_output {
            outputs.extend_from_slice(output);
        }
        awaiting_output = 0;

        // Output-only evaluation: every row is filled and `next` is discarded.
        if index == last {
            break Status::Complete;
        }

        let event = Event {
            step: index,
            t,
            state: &current,
            next: &next.state,
            output: next.output.as_deref(),
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            debug!(step = index, rows = filled, "observer stopped the solve early");
            break Status::StoppedByObserver;
        }

        frame.borrow_mut().history.append(&next.state);
        current = next.state;
        index += 1;
    };

    let history = config
        .returns_history()
        .then(|| frame.borrow().history.export());

    Ok(Solution {
        status,
        steps: rows[..filled].to_vec(),
        states: columns(&states, n, filled),
        outputs: (n_out > 0).then(|| columns(&outputs, n_out, filled)),
        history,
        evaluations,
    })
}

/// Checks an update against the problem's dimensions.
///
/// Returns the auxiliary output to record, which is empty when `n_out` is 0.
fn checked_output(update: &Update, step: usize, n: usize, n_out: usize) -> Result<&[f64], Error> {
    if update.state.len() != n {
        return Err(Error::StateLength {
            step,
            expected: n,
            received: update.state.len(),
        });
    }
    if n_out == 0 {
        return Ok(&[]);
    }

    let output = update
        .output
        .as_deref()
        .ok_or(Error::MissingOutput { step })?;
    if output.len() != n_out {
        return Err(Error::OutputLength {
            step,
            expected: n_out,
            received: output.len(),
        });
    }
    Ok(output)
}
