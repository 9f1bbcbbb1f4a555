use solana_sdk::signature::Signature;

use crate::{
    context::FlowResults,
    error::{FlowErrorKind, StepError},
    executor::CompletedUnit,
    planner::ExecutionUnit,
    submitter::SubmitError,
    transaction::SkeletonError,
};

#[derive(thiserror::Error, Debug)]
pub enum FlowExecutorError {
    #[error("Step '{0}' doesn't fit in a transaction on its own")]
    OversizedInstruction(String),
    #[error("Steps {0:?} don't fit in the same transaction")]
    PackingOverflow(Vec<String>),
    #[error("Failed to create instructions of step '{step}': {err}")]
    StepCreationError {
        step: String,
        #[source]
        err: StepError,
    },
    #[error("Transaction step '{step}' failed: {err}")]
    TransactionStepError {
        step: String,
        #[source]
        err: StepError,
    },
    #[error("Step '{0}' isn't part of the flow")]
    UnknownStep(String),
    #[error("Failed to resolve transaction lifetime: {0}")]
    LifetimeError(#[source] SubmitError),
    #[error("Failed to build transaction: {0}")]
    SkeletonError(#[from] SkeletonError),
    #[error("SubmitError: {0}")]
    SubmitError(#[from] SubmitError),
}

impl FlowExecutorError {
    pub fn kind(&self) -> FlowErrorKind {
        match self {
            Self::OversizedInstruction(_) => {
                FlowErrorKind::OversizedInstruction
            }
            Self::PackingOverflow(_) => FlowErrorKind::PackingOverflow,
            Self::StepCreationError { .. } => FlowErrorKind::StepCreation,
            Self::TransactionStepError { .. } => {
                FlowErrorKind::TransactionStep
            }
            Self::UnknownStep(_) => FlowErrorKind::Construction,
            Self::LifetimeError(_) | Self::SkeletonError(_) => {
                FlowErrorKind::Signing
            }
            Self::SubmitError(_) => FlowErrorKind::Submission,
        }
    }

    pub fn signature(&self) -> Option<Signature> {
        match self {
            Self::SubmitError(err) => err.signature(),
            Self::TransactionStepError {
                err: StepError::SubmitError(err),
                ..
            } => err.signature(),
            _ => None,
        }
    }
}

pub type FlowExecutorResult<T, E = FlowExecutorError> = Result<T, E>;

/// Failure of a flow together with everything that completed before it.
/// Transactions of completed units have landed and aren't rolled back.
#[derive(thiserror::Error, Debug)]
#[error(
    "Flow failed at unit {unit_index} {:?}: {error}",
    .failing_unit.step_names
)]
pub struct FlowExecutionError {
    #[source]
    pub error: FlowExecutorError,
    pub unit_index: usize,
    pub failing_unit: ExecutionUnit,
    pub completed_units: Vec<CompletedUnit>,
    pub partial_results: FlowResults,
}

impl FlowExecutionError {
    pub fn kind(&self) -> FlowErrorKind {
        self.error.kind()
    }
}

pub type FlowExecutionResult<T, E = FlowExecutionError> = Result<T, E>;
