use solana_sdk::signer::SignerError;

use crate::submitter::SubmitError;

/// Coarse classification of why a flow didn't complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowErrorKind {
    /// Flow is malformed and was never executed
    Construction,
    /// A single step doesn't fit in a transaction on its own
    OversizedInstruction,
    /// A unit doesn't fit in one transaction under the batch strategy
    PackingOverflow,
    /// An instruction creator failed
    StepCreation,
    /// Transaction couldn't be compiled or signed
    Signing,
    /// Transaction wasn't confirmed
    Submission,
    /// A transaction step failed
    TransactionStep,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowBuildError {
    #[error("Flow has no steps")]
    EmptyFlow,
    #[error("Step at position {0} has an empty name")]
    EmptyStepName(usize),
    #[error("Duplicate step name: '{0}'")]
    DuplicateStepName(String),
    #[error("Atomic group '{0}' has no instructions")]
    EmptyAtomicGroup(String),
}

impl FlowBuildError {
    pub fn kind(&self) -> FlowErrorKind {
        FlowErrorKind::Construction
    }
}

pub type FlowBuildResult<T, E = FlowBuildError> = Result<T, E>;

/// Error returned by instruction creators and transaction steps
#[derive(thiserror::Error, Debug)]
pub enum StepError {
    #[error("Result of step '{0}' isn't available")]
    MissingResult(String),
    #[error("SubmitError: {0}")]
    SubmitError(#[from] SubmitError),
    #[error("SignerError: {0}")]
    SignerError(#[from] SignerError),
    #[error("{0}")]
    Custom(String),
}

impl StepError {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

pub type StepCreationResult<T, E = StepError> = Result<T, E>;
