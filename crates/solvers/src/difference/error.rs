use std::error::Error as StdError;

use super::ConfigError;

/// Errors that can occur while creating or running a difference solve.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("step schedule is empty")]
    EmptySchedule,

    #[error("step schedule must be non-decreasing: step {next} follows {previous} at position {position}")]
    UnorderedSchedule {
        position: usize,
        previous: usize,
        next: usize,
    },

    #[error("step {step} is the largest representable step index and cannot be scheduled")]
    StepOverflow { step: usize },

    #[error("initial state has length {received}, expected {expected}")]
    InitialLength { expected: usize, received: usize },

    #[error("update function failed at step {step}: {source}")]
    Update {
        step: usize,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("update function returned a state of length {received} at step {step}, expected {expected}")]
    StateLength {
        step: usize,
        expected: usize,
        received: usize,
    },

    #[error("missing output at step {step}")]
    MissingOutput { step: usize },

    #[error("incorrect length output at step {step}: expected {expected}, received {received}")]
    OutputLength {
        step: usize,
        expected: usize,
        received: usize,
    },

    #[error("solve context has been released")]
    Released,
}

impl Error {
    pub(crate) fn update<E: StdError + Send + Sync + 'static>(step: usize, err: E) -> Self {
        Self::Update {
            step,
            source: Box::new(err),
        }
    }

    /// Returns `true` for errors detected before the first update-function call.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::EmptySchedule
                | Self::UnorderedSchedule { .. }
                | Self::StepOverflow { .. }
                | Self::InitialLength { .. }
        )
    }

    /// Returns `true` if the update function broke its output contract.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::StateLength { .. } | Self::MissingOutput { .. } | Self::OutputLength { .. }
        )
    }
}
