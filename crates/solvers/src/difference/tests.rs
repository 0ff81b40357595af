use std::cell::RefCell;
use std::convert::Infallible;

use approx::assert_relative_eq;
use difeq_core::{LagError, Lags, Step, Update, UpdateFn, from_fn};

use super::{Action, Config, Error, Event, RunState, SolveContext, Status, lag};

/// y[i+1] = y[i] + 1, componentwise.
fn increment() -> impl UpdateFn<(), Error = Infallible> {
    from_fn(|step: &Step<'_>, _: &(), _: &dyn Lags| {
        Ok::<_, Infallible>(Update::new(step.state.iter().map(|y| y + 1.0).collect()))
    })
}

/// y[i+1] = y[i] + 1, reporting [y[i], t] as auxiliary output.
fn increment_with_output() -> impl UpdateFn<(), Error = Infallible> {
    from_fn(|step: &Step<'_>, _: &(), _: &dyn Lags| {
        let next = vec![step.state[0] + 1.0];
        Ok::<_, Infallible>(Update::new(next).with_output(vec![step.state[0], step.t]))
    })
}

/// y[i+1] = y[i-2], which needs two steps of history.
fn delay_two() -> impl UpdateFn<(), Error = LagError> {
    from_fn(|step: &Step<'_>, _: &(), lags: &dyn Lags| {
        let delayed = lags.lookup_one(step.index as i64 - 2, 0)?;
        Ok(Update::new(vec![delayed]))
    })
}

fn row(values: ndarray::ArrayView1<'_, f64>) -> Vec<f64> {
    values.to_vec()
}

// --- Stepping ---

#[test]
fn increments_through_schedule() {
    let mut context = SolveContext::new(1, 0, 10, increment(), ());

    let solution = context
        .run(&[0.0], &[0, 1, 2, 3], &Config::default())
        .expect("should solve");

    assert_eq!(solution.status, Status::Complete);
    assert_eq!(solution.states.dim(), (1, 4));
    assert_eq!(row(solution.states.row(0)), vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(solution.steps, vec![0, 1, 2, 3]);
    assert_eq!(solution.evaluations, 3);
    assert!(solution.outputs.is_none());
    assert!(solution.history.is_none());
    assert_eq!(context.state(), RunState::Completed);
}

#[test]
fn one_column_per_scheduled_row() {
    let mut context = SolveContext::new(3, 0, 0, increment(), ());
    let config = Config::default().include_initial(false);

    let solution = context
        .run(&[0.0, 10.0, 20.0], &[0, 2, 5], &config)
        .expect("should solve");

    assert_eq!(solution.states.dim(), (3, 2));
    assert_eq!(solution.steps, vec![2, 5]);
    assert_eq!(row(solution.states.column(0)), vec![2.0, 12.0, 22.0]);
    assert_eq!(row(solution.states.column(1)), vec![5.0, 15.0, 25.0]);
    assert_eq!(solution.evaluations, 5);
}

#[test]
fn single_step_schedule_without_initial_is_empty() {
    let mut context = SolveContext::new(2, 0, 4, increment(), ());
    let config = Config::default().include_initial(false);

    let solution = context
        .run(&[1.0, 2.0], &[7], &config)
        .expect("should solve");

    assert_eq!(solution.rows(), 0);
    assert_eq!(solution.states.dim(), (2, 0));
    assert_eq!(solution.evaluations, 0);
    assert!(solution.last_state().is_none());
}

#[test]
fn zero_dimensional_states_are_allowed() {
    let mut context = SolveContext::new(0, 0, 3, increment(), ());

    let solution = context
        .run(&[], &[0, 1, 2], &Config::default())
        .expect("should solve");

    assert_eq!(solution.states.dim(), (0, 3));
    assert_eq!(solution.evaluations, 2);
}

#[test]
fn repeated_schedule_entries_repeat_rows() {
    let mut context = SolveContext::new(1, 0, 0, increment(), ());

    let solution = context
        .run(&[0.0], &[0, 2, 2, 3], &Config::default())
        .expect("should solve");

    assert_eq!(row(solution.states.row(0)), vec![0.0, 2.0, 2.0, 3.0]);
    assert_eq!(solution.steps, vec![0, 2, 2, 3]);
}

#[test]
fn clock_follows_absolute_step_index() {
    let times = RefCell::new(Vec::new());
    let update = from_fn(|step: &Step<'_>, _: &(), _: &dyn Lags| {
        times.borrow_mut().push((step.index, step.t));
        Ok::<_, Infallible>(Update::new(step.state.to_vec()))
    });
    let mut context = SolveContext::new(1, 0, 0, update, ());
    let config = Config::new(1.0, 0.5).unwrap();

    context
        .run(&[0.0], &[4, 6], &config)
        .expect("should solve");

    let times = times.borrow();
    assert_eq!(times.len(), 2);
    assert_eq!(times[0].0, 4);
    assert_relative_eq!(times[0].1, 3.0);
    assert_eq!(times[1].0, 5);
    assert_relative_eq!(times[1].1, 3.5);
}

#[test]
fn params_are_forwarded_by_reference() {
    struct Gain(f64);

    let update = from_fn(|step: &Step<'_>, gain: &Gain, _: &dyn Lags| {
        Ok::<_, Infallible>(Update::new(vec![step.state[0] * gain.0]))
    });
    let mut context = SolveContext::new(1, 0, 0, update, Gain(2.0));

    let first = context.run(&[1.0], &[0, 3], &Config::default()).unwrap();
    assert_relative_eq!(first.states[[0, 1]], 8.0);

    context.params_mut().0 = 3.0;
    let second = context.run(&[1.0], &[0, 2], &Config::default()).unwrap();
    assert_relative_eq!(second.states[[0, 1]], 9.0);
}

// --- Auxiliary output ---

#[test]
fn output_belongs_to_the_state_it_was_computed_from() {
    let mut context = SolveContext::new(1, 2, 0, increment_with_output(), ());
    let config = Config::new(0.0, 0.1).unwrap();

    let solution = context
        .run(&[5.0], &[0, 1, 3], &config)
        .expect("should solve");

    let outputs = solution.outputs.as_ref().expect("outputs requested");
    assert_eq!(outputs.dim(), (2, 3));
    assert_eq!(row(outputs.row(0)), row(solution.states.row(0)));
    assert_relative_eq!(outputs[[1, 2]], 0.3);

    // One extra evaluation fills the last row's output.
    assert_eq!(solution.evaluations, 4);
}

#[test]
fn output_rows_without_initial() {
    let mut context = SolveContext::new(1, 2, 0, increment_with_output(), ());
    let config = Config::default().include_initial(false);

    let solution = context.run(&[0.0], &[0, 2], &config).unwrap();

    let output = solution.output(0).expect("one row");
    assert_relative_eq!(output[0], 2.0);
    assert_relative_eq!(solution.state(0).unwrap()[0], 2.0);
    assert!(solution.output(1).is_none());
}

#[test]
fn short_output_is_an_incorrect_length_error() {
    let update = from_fn(|step: &Step<'_>, _: &(), _: &dyn Lags| {
        Ok::<_, Infallible>(Update::new(step.state.to_vec()).with_output(vec![1.0]))
    });
    let mut context = SolveContext::new(1, 2, 5, update, ());

    let err = context
        .run(&[0.0], &[0, 1, 2], &Config::default())
        .expect_err("output is one short");

    assert!(matches!(
        err,
        Error::OutputLength {
            step: 0,
            expected: 2,
            received: 1
        }
    ));
    assert!(err.is_contract_violation());
    assert_eq!(
        err.to_string(),
        "incorrect length output at step 0: expected 2, received 1"
    );
    assert_eq!(context.state(), RunState::Failed);
    assert!(!lag::is_active());

    context.release();
    assert!(context.is_released());
    context.release();
    assert!(context.is_released());
}

#[test]
fn missing_output_is_reported() {
    let mut context = SolveContext::new(1, 1, 0, increment(), ());

    let err = context
        .run(&[0.0], &[0, 1], &Config::default())
        .expect_err("no output produced");

    assert!(matches!(err, Error::MissingOutput { step: 0 }));
}

#[test]
fn output_is_ignored_when_not_configured() {
    let mut context = SolveContext::new(1, 0, 0, increment_with_output(), ());

    let solution = context.run(&[0.0], &[0, 2], &Config::default()).unwrap();

    assert!(solution.outputs.is_none());
    assert_eq!(solution.evaluations, 2);
}

#[test]
fn wrong_state_length_is_reported() {
    let update = from_fn(|_: &Step<'_>, _: &(), _: &dyn Lags| {
        Ok::<_, Infallible>(Update::new(vec![0.0; 3]))
    });
    let mut context = SolveContext::new(2, 0, 0, update, ());

    let err = context
        .run(&[0.0, 0.0], &[0, 1], &Config::default())
        .expect_err("state is too long");

    assert!(matches!(
        err,
        Error::StateLength {
            step: 0,
            expected: 2,
            received: 3
        }
    ));
}

// --- Lagged values ---

#[test]
fn lag_beyond_available_history_is_out_of_window() {
    let mut context = SolveContext::new(1, 0, 5, delay_two(), ());

    let err = context
        .run(&[1.0], &[0, 1, 2, 3], &Config::default())
        .expect_err("no history two steps back at step 0");

    let Error::Update { step, source } = &err else {
        panic!("expected an update error, got {err:?}");
    };
    assert_eq!(*step, 0);
    assert_eq!(
        source.downcast_ref::<LagError>(),
        Some(&LagError::OutOfWindow {
            step: -2,
            oldest: 0,
            newest: 0
        })
    );
    assert_eq!(context.state(), RunState::Failed);
}

#[test]
fn lag_reads_history_once_deep_enough() {
    let update = from_fn(|step: &Step<'_>, _: &(), lags: &dyn Lags| {
        let delayed = if step.index >= 2 {
            lags.lookup_one(step.index as i64 - 2, 0)?
        } else {
            0.0
        };
        Ok::<_, LagError>(Update::new(vec![step.state[0] + 1.0 + delayed]))
    });
    let mut context = SolveContext::new(1, 0, 3, update, ());

    let solution = context
        .run(&[0.0], &[0, 1, 2, 3, 4, 5], &Config::default())
        .expect("history is deep enough");

    // 0, 1, 2, 2+1+0, 3+1+1, 5+1+2
    assert_eq!(
        row(solution.states.row(0)),
        vec![0.0, 1.0, 2.0, 3.0, 5.0, 8.0]
    );
}

#[test]
fn lag_evicted_by_small_history_is_out_of_window() {
    let update = from_fn(|step: &Step<'_>, _: &(), lags: &dyn Lags| {
        if step.index >= 2 {
            lags.lookup_one(step.index as i64 - 2, 0)?;
        }
        Ok::<_, LagError>(Update::new(vec![step.state[0] + 1.0]))
    });
    let mut context = SolveContext::new(1, 0, 2, update, ());

    let err = context
        .run(&[1.0], &[0, 5], &Config::default())
        .expect_err("capacity 2 cannot reach two steps back");

    let Error::Update { step, source } = err else {
        panic!("expected an update error");
    };
    assert_eq!(step, 2);
    assert_eq!(
        source.downcast_ref::<LagError>(),
        Some(&LagError::OutOfWindow {
            step: 0,
            oldest: 1,
            newest: 2
        })
    );
}

#[test]
fn current_step_is_visible_but_the_next_is_not() {
    let update = from_fn(|step: &Step<'_>, _: &(), lags: &dyn Lags| {
        let here = step.index as i64;
        assert_eq!(lags.lookup_all(here)?, step.state.to_vec());
        assert_eq!(lags.current_step(), step.index);
        assert_eq!(
            lags.lookup_all(here + 1),
            Err(LagError::NotYetComputed {
                step: here + 1,
                current: step.index
            })
        );
        Ok::<_, LagError>(Update::new(vec![step.state[0] * 2.0]))
    });
    let mut context = SolveContext::new(1, 0, 4, update, ());

    let solution = context.run(&[1.0], &[0, 3], &Config::default()).unwrap();
    assert_relative_eq!(solution.states[[0, 1]], 8.0);
}

#[test]
fn implicit_queries_match_the_explicit_handle() {
    let update = from_fn(|step: &Step<'_>, _: &(), lags: &dyn Lags| {
        assert!(lag::is_active());
        let back = step.index.saturating_sub(1) as i64;
        let explicit = lags.lookup_all(back)?;
        assert_eq!(lag::lookup_all(back)?, explicit);
        assert_eq!(lag::lookup_many(back, &[0, 1])?, explicit);
        assert_relative_eq!(lag::lookup_one(back, 1)?, explicit[1]);
        Ok::<_, LagError>(Update::new(vec![step.state[0] + 1.0, step.state[1] - 1.0]))
    });
    let mut context = SolveContext::new(2, 0, 4, update, ());

    context
        .run(&[0.0, 0.0], &[0, 4], &Config::default())
        .expect("queries succeed");

    assert!(!lag::is_active());
    assert_eq!(lag::lookup_one(0, 0), Err(LagError::NoActiveSolve));
}

#[test]
fn initial_state_can_be_left_out_of_history() {
    let update = from_fn(|step: &Step<'_>, _: &(), lags: &dyn Lags| {
        if step.index == 0 {
            assert_eq!(lags.lookup_all(0), Err(LagError::EmptyHistory { step: 0 }));
        }
        Ok::<_, LagError>(Update::new(vec![step.state[0] + 1.0]))
    });
    let mut context = SolveContext::new(1, 0, 10, update, ());
    let config = Config::default().retain_initial(false).return_history(true);

    let solution = context.run(&[0.0], &[0, 3], &config).unwrap();

    let history = solution.history.expect("history requested");
    assert_eq!(history.first_step(), 1);
    assert_eq!(history.values().row(0).to_vec(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn nested_solve_restores_the_outer_active_context() {
    let outer = from_fn(|step: &Step<'_>, _: &(), _: &dyn Lags| {
        let mut inner = SolveContext::new(1, 0, 2, increment(), ());
        let inner_solution = inner
            .run(&[100.0], &[0, 5], &Config::default())
            .expect("inner solve");
        assert_relative_eq!(inner_solution.states[[0, 1]], 105.0);

        // The outer solve is active again.
        let here = lag::lookup_one(step.index as i64, 0)?;
        assert_relative_eq!(here, step.state[0]);
        Ok::<_, LagError>(Update::new(vec![here + 1.0]))
    });
    let mut context = SolveContext::new(1, 0, 3, outer, ());

    let solution = context
        .run(&[0.0], &[0, 2], &Config::default())
        .expect("outer solve");

    assert_relative_eq!(solution.states[[0, 1]], 2.0);
}

// --- History export ---

#[test]
fn returned_history_is_the_sliding_window() {
    let mut context = SolveContext::new(1, 0, 2, increment(), ());
    let config = Config::default().return_history(true);

    let solution = context.run(&[0.0], &[0, 5], &config).unwrap();

    let history = solution.history.expect("history requested");
    assert_eq!(history.n(), 1);
    assert_eq!(history.len(), 2);
    assert_eq!(history.first_step(), 4);
    assert_eq!(history.values().row(0).to_vec(), vec![4.0, 5.0]);

    // Export from the context is repeatable and matches.
    let first = context.take_history().unwrap();
    let second = context.take_history().unwrap();
    assert_eq!(first, second);
    assert_eq!(first, history);
}

#[test]
fn rerun_starts_from_a_clear_history() {
    let mut context = SolveContext::new(1, 0, 10, increment(), ());

    context.run(&[0.0], &[0, 6], &Config::default()).unwrap();
    assert_eq!(context.history().unwrap().used_count(), 7);

    context.run(&[0.0], &[3, 4], &Config::default()).unwrap();
    let history = context.history().unwrap();
    assert_eq!(history.used_count(), 2);
    assert_eq!(history.oldest_step(), Some(3));
}

// --- Observers ---

#[test]
fn observer_sees_every_evaluation() {
    let mut seen = Vec::new();
    let mut context = SolveContext::new(1, 0, 0, increment(), ());

    context
        .run_observed(
            &[0.0],
            &[0, 3],
            &Config::default(),
            |event: &Event<'_>| {
                seen.push((event.step, event.state[0], event.next[0]));
                None
            },
        )
        .unwrap();

    assert_eq!(seen, vec![(0, 0.0, 1.0), (1, 1.0, 2.0), (2, 2.0, 3.0)]);
}

#[test]
fn output_only_evaluation_is_not_observed() {
    let stop_at_three = |event: &Event<'_>| (event.next[0] >= 3.0).then_some(Action::StopEarly);

    let mut with_output = SolveContext::new(1, 2, 0, increment_with_output(), ());
    let solution = with_output
        .run_observed(&[0.0], &[0, 1, 2], &Config::default(), stop_at_three)
        .expect("should solve");
    assert_eq!(solution.status, Status::Complete);
    assert_eq!(solution.steps, vec![0, 1, 2]);
    assert_eq!(solution.evaluations, 3);

    let mut without_output = SolveContext::new(1, 0, 0, increment(), ());
    let solution = without_output
        .run_observed(&[0.0], &[0, 1, 2], &Config::default(), stop_at_three)
        .expect("should solve");
    assert_eq!(solution.status, Status::Complete);

    let mut steps = Vec::new();
    with_output
        .run_observed(&[0.0], &[0, 2], &Config::default(), |event: &Event<'_>| {
            steps.push(event.step);
            None
        })
        .unwrap();
    assert_eq!(steps, vec![0, 1]);
}

#[test]
fn observer_can_stop_early() {
    let mut context = SolveContext::new(1, 0, 0, increment(), ());
    let observer = |event: &Event<'_>| (event.step >= 2).then_some(Action::StopEarly);

    let solution = context
        .run_observed(&[0.0], &[0, 1, 2, 3, 4, 5], &Config::default(), observer)
        .expect("should stop early");

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.steps, vec![0, 1, 2]);
    assert_eq!(row(solution.states.row(0)), vec![0.0, 1.0, 2.0]);
    assert_eq!(solution.evaluations, 3);
    assert_eq!(context.state(), RunState::Completed);
}

// --- Configuration and lifecycle ---

#[test]
fn invalid_inputs_are_rejected_before_stepping() {
    let calls = RefCell::new(0);
    let update = from_fn(|step: &Step<'_>, _: &(), _: &dyn Lags| {
        *calls.borrow_mut() += 1;
        Ok::<_, Infallible>(Update::new(step.state.to_vec()))
    });
    let mut context = SolveContext::new(2, 0, 0, update, ());
    let config = Config::default();

    let empty = context.run(&[0.0, 0.0], &[], &config).unwrap_err();
    assert!(matches!(empty, Error::EmptySchedule));

    let unordered = context.run(&[0.0, 0.0], &[0, 3, 2], &config).unwrap_err();
    assert!(matches!(
        unordered,
        Error::UnorderedSchedule {
            position: 2,
            previous: 3,
            next: 2
        }
    ));

    let short = context.run(&[0.0], &[0, 1], &config).unwrap_err();
    assert!(matches!(
        short,
        Error::InitialLength {
            expected: 2,
            received: 1
        }
    ));

    let overflow = context
        .run(&[0.0, 0.0], &[usize::MAX - 1, usize::MAX], &config)
        .unwrap_err();
    assert!(matches!(overflow, Error::StepOverflow { step: usize::MAX }));

    for err in [&empty, &unordered, &short, &overflow] {
        assert!(err.is_configuration());
    }
    assert_eq!(*calls.borrow(), 0);
    assert_eq!(context.state(), RunState::Idle);
}

#[test]
fn released_context_cannot_run() {
    let mut context = SolveContext::new(1, 0, 4, increment(), ());
    context.release();

    let err = context
        .run(&[0.0], &[0, 1], &Config::default())
        .expect_err("released");
    assert!(matches!(err, Error::Released));
    assert!(matches!(context.history(), Err(Error::Released)));
    assert!(matches!(context.take_history(), Err(Error::Released)));
}

#[test]
fn run_once_returns_the_solution_on_success_and_failure() {
    let solution = SolveContext::new(1, 0, 4, increment(), ())
        .run_once(&[0.0], &[0, 2], &Config::default())
        .expect("should solve");
    assert_relative_eq!(solution.states[[0, 1]], 2.0);

    let err = SolveContext::new(1, 0, 4, delay_two(), ())
        .run_once(&[0.0], &[0, 2], &Config::default())
        .expect_err("lag too deep");
    assert!(matches!(err, Error::Update { step: 0, .. }));
    assert!(!lag::is_active());
}

#[test]
fn panicking_update_function_deactivates_the_context() {
    let update = from_fn(|step: &Step<'_>, _: &(), _: &dyn Lags| {
        if step.index == 1 {
            panic!("boom");
        }
        Ok::<_, Infallible>(Update::new(step.state.to_vec()))
    });
    let mut context = SolveContext::new(1, 0, 4, update, ());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        context.run(&[0.0], &[0, 3], &Config::default())
    }));

    assert!(result.is_err());
    assert!(!lag::is_active());
    assert_eq!(context.state(), RunState::Failed);
    assert!(context.history().unwrap().newest_step().is_some());

    let rerun = context.run(&[0.0], &[0, 1], &Config::default());
    assert!(rerun.is_ok());
    assert_eq!(context.state(), RunState::Completed);
    context.release();
    assert!(context.is_released());
}
