mod compute_budget;
pub mod config;
mod consts;
pub mod context;
pub mod error;
pub mod executor;
pub mod flow;
pub mod planner;
pub mod step;
#[cfg(any(test, feature = "dev-context-only-utils"))]
pub mod stubs;
pub mod submitter;
pub mod transaction;

pub use compute_budget::ComputeBudgetConfig;
pub use config::{Commitment, FlowConfig, SendConfig};
pub use consts::MAX_TRANSACTION_SIZE;
pub use context::{FlowContext, FlowResults, StepResult};
pub use error::{FlowBuildError, FlowErrorKind, StepError};
pub use executor::{
    ExecuteOptions, FlowExecutionError, FlowExecutor, FlowOutput, FlowStatus,
    UnitState,
};
pub use flow::{Flow, FlowBuilder};
pub use planner::ExecutionStrategy;
pub use step::{CustomTransaction, InstructionCreator, Step};
pub use submitter::{SubmitError, TransactionSubmitter};
