use std::fmt;

use thiserror::Error;

/// Phase of a benchmark run an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Validate,
    Plan,
    WarmUp,
    Trial(usize),
    Compare,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve => f.write_str("resolve"),
            Stage::Validate => f.write_str("validate"),
            Stage::Plan => f.write_str("plan"),
            Stage::WarmUp => f.write_str("warm-up"),
            Stage::Trial(i) => write!(f, "trial-{i}"),
            Stage::Compare => f.write_str("compare"),
        }
    }
}

/// Failure reported by an engine or device collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Every failure is fatal for the run; nothing is retried.
#[derive(Error, Debug)]
pub enum RiderError {
    #[error("invalid descriptor at {stage}: {reason}")]
    InvalidDescriptor { stage: Stage, reason: String },

    #[error("engine failure at {stage}: {source}")]
    EngineFailure {
        stage: Stage,
        #[source]
        source: EngineError,
    },

    #[error("device transfer failure at {stage}: {source}")]
    DeviceTransferFailure {
        stage: Stage,
        #[source]
        source: EngineError,
    },

    #[error("allocation of {bytes} bytes failed at {stage}: {source}")]
    AllocationFailure {
        stage: Stage,
        bytes: usize,
        #[source]
        source: EngineError,
    },
}

impl RiderError {
    pub fn invalid(stage: Stage, reason: impl Into<String>) -> Self {
        RiderError::InvalidDescriptor { stage, reason: reason.into() }
    }

    pub fn engine(stage: Stage, source: EngineError) -> Self {
        RiderError::EngineFailure { stage, source }
    }

    pub fn transfer(stage: Stage, source: EngineError) -> Self {
        RiderError::DeviceTransferFailure { stage, source }
    }

    pub fn allocation(stage: Stage, bytes: usize, source: EngineError) -> Self {
        RiderError::AllocationFailure { stage, bytes, source }
    }

    /// The stage that failed.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            RiderError::InvalidDescriptor { stage, .. }
            | RiderError::EngineFailure { stage, .. }
            | RiderError::DeviceTransferFailure { stage, .. }
            | RiderError::AllocationFailure { stage, .. } => *stage,
        }
    }
}

pub type Result<T> = std::result::Result<T, RiderError>;
