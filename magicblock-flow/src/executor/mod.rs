pub mod error;
mod flow_run;
pub mod hooks;

use std::sync::Arc;

pub use error::{
    FlowExecutionError, FlowExecutionResult, FlowExecutorError,
    FlowExecutorResult,
};
pub use hooks::{FlowHooks, NoopHooks};
use log::info;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    signature::{Keypair, Signature},
    signer::Signer,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{Commitment, FlowConfig},
    context::{FlowContext, FlowResults},
    executor::flow_run::FlowRun,
    flow::Flow,
    planner::{ExecutionStrategy, ExecutionUnit},
    submitter::TransactionSubmitter,
    transaction::{
        InstructionPacker, Lifetime, SizeEstimator, TransactionSkeleton,
    },
};

/// Progress of a single execution unit. States are reported in this order,
/// a failing unit reports [`UnitState::Failed`] after the last state
/// it reached. Transaction step units go from `Pending` straight to
/// `Confirmed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Building,
    Signing,
    Sending,
    Confirmed,
    Failed,
}

/// Unit whose transaction was confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUnit {
    pub unit: ExecutionUnit,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStatus {
    Completed,
    /// Cancelled between units, `pending_steps` didn't complete.
    /// They include steps of a split `Auto` unit whose `on_step_start`
    /// already fired, no other hook fires for them.
    Cancelled { pending_steps: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutput {
    pub status: FlowStatus,
    pub results: FlowResults,
    pub completed_units: Vec<CompletedUnit>,
}

impl FlowOutput {
    pub fn is_completed(&self) -> bool {
        self.status == FlowStatus::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, FlowStatus::Cancelled { .. })
    }

    /// Number of transactions the flow landed
    pub fn transaction_count(&self) -> usize {
        self.completed_units.len()
    }
}

/// Per call overrides of [`FlowConfig`]
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub strategy: Option<ExecutionStrategy>,
    pub commitment: Option<Commitment>,
    pub cancel: Option<CancellationToken>,
}

impl ExecuteOptions {
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = Some(commitment);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Executes flows as a sequence of transactions signed by `authority`,
/// which also pays for them.
pub struct FlowExecutor {
    authority: Arc<Keypair>,
    submitter: Arc<dyn TransactionSubmitter>,
    hooks: Arc<dyn FlowHooks>,
    config: FlowConfig,
    lifetime: Lifetime,
}

impl FlowExecutor {
    pub fn new(
        authority: Arc<Keypair>,
        submitter: Arc<dyn TransactionSubmitter>,
        config: FlowConfig,
    ) -> Self {
        Self {
            authority,
            submitter,
            hooks: Arc::new(NoopHooks),
            config,
            lifetime: Lifetime::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn FlowHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn authority(&self) -> &Keypair {
        &self.authority
    }

    /// Skeleton shared by all batched transactions of this executor
    pub fn skeleton(&self) -> TransactionSkeleton {
        TransactionSkeleton::new(self.authority.pubkey())
            .with_lifetime(self.lifetime)
            .with_compute_budget(self.config.compute_budget)
    }

    /// Runs `flow` to completion, failure or cancellation.
    /// Units run strictly one after another, a unit starts only once the
    /// previous unit's transaction reached the requested commitment.
    pub async fn execute(
        &self,
        flow: &Flow,
        options: ExecuteOptions,
    ) -> FlowExecutionResult<FlowOutput> {
        let strategy = options.strategy.unwrap_or(self.config.strategy);
        let commitment: CommitmentConfig =
            options.commitment.unwrap_or(self.config.commitment).into();
        let cancel = options.cancel.unwrap_or_default();

        let units = flow.plan(strategy);
        info!(
            "Executing flow of {} steps in {} units with {:?} strategy",
            flow.len(),
            units.len(),
            strategy
        );

        let context = FlowContext::new(
            self.authority.clone(),
            self.submitter.clone(),
            commitment,
            cancel.clone(),
        );
        let packer = InstructionPacker::new(SizeEstimator::new(
            self.config.size_ceiling,
        ));
        FlowRun {
            flow,
            strategy,
            skeleton: self.skeleton(),
            packer,
            hooks: self.hooks.as_ref(),
            context,
            cancel,
            queue: units.into_iter().map(Into::into).collect(),
            started: Vec::new(),
            completed_units: Vec::new(),
        }
        .run()
        .await
    }
}
