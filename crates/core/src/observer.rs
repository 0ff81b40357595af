/// Watches a running solve and may ask it to change course.
///
/// The stepper hands every event it produces to its observer. The observer
/// answers with `Some(action)` to steer the run (for example to stop it once a
/// state crosses a threshold) or with `None` to let it carry on.
///
/// Any `FnMut(&E) -> Option<A>` closure is an observer, and `()` is the
/// observer that never intervenes.
pub trait Observer<E, A> {
    /// Inspects one event and optionally returns an action for the stepper.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}
