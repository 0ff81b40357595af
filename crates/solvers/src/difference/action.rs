/// Control actions supported by the difference stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop stepping and return the rows completed so far.
    StopEarly,
}
