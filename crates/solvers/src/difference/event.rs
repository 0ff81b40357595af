/// Event emitted by the difference stepper after each update-function call.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    /// The step index of `state`.
    pub step: usize,

    /// The time at `step`.
    pub t: f64,

    /// The state the update function was called with.
    pub state: &'a [f64],

    /// The state it produced for `step + 1`.
    pub next: &'a [f64],

    /// Auxiliary output produced alongside `next`, if any.
    pub output: Option<&'a [f64]>,
}
