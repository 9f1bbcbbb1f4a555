use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use magicblock_flow::{
    executor::{FlowExecutorError, FlowHooks},
    planner::ExecutionUnit,
    stubs::{InMemorySubmitter, NoopTransaction, RecordingHooks},
    transaction::TransactionSkeleton,
    CustomTransaction, FlowConfig, FlowContext, FlowExecutor, StepError,
    StepResult, UnitState,
};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};
use tokio_util::sync::CancellationToken;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct TestFixture {
    pub authority: Arc<Keypair>,
    pub submitter: Arc<InMemorySubmitter>,
    pub hooks: Arc<RecordingHooks>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_submitter(InMemorySubmitter::default())
    }

    pub fn with_submitter(submitter: InMemorySubmitter) -> Self {
        init_logger();
        Self {
            authority: Arc::new(Keypair::new()),
            submitter: Arc::new(submitter),
            hooks: Arc::new(RecordingHooks::default()),
        }
    }

    pub fn executor(&self, config: FlowConfig) -> FlowExecutor {
        FlowExecutor::new(
            self.authority.clone(),
            self.submitter.clone(),
            config,
        )
        .with_hooks(self.hooks.clone())
    }
}

/// Instruction with its own program and one writable account
pub fn ix(data_len: usize) -> Instruction {
    Instruction::new_with_bytes(
        Pubkey::new_unique(),
        &vec![1; data_len],
        vec![AccountMeta::new(Pubkey::new_unique(), false)],
    )
}

/// Creator returning `instruction` that counts how often it runs
pub fn counted(
    instruction: Instruction,
    calls: Arc<AtomicUsize>,
) -> impl Fn(&FlowContext) -> Result<Instruction, StepError>
       + Send
       + Sync
       + 'static {
    move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(instruction.clone())
    }
}

pub fn instruction_count(tx: &VersionedTransaction) -> usize {
    tx.message.instructions().len()
}

pub fn program_ids(tx: &VersionedTransaction) -> Vec<Pubkey> {
    let keys = tx.message.static_account_keys();
    tx.message
        .instructions()
        .iter()
        .map(|ix| *ix.program_id(keys))
        .collect()
}

/// Transaction step landing one instruction through the flow's submitter
pub struct SingleInstructionTransaction(pub Instruction);

#[async_trait]
impl CustomTransaction for SingleInstructionTransaction {
    async fn execute(
        &self,
        ctx: &FlowContext,
    ) -> Result<StepResult, StepError> {
        let skeleton = TransactionSkeleton::new(ctx.fee_payer());
        let blockhash = ctx
            .submitter()
            .resolve_lifetime(skeleton.lifetime())
            .await?;
        let tx = skeleton
            .sign(ctx.authority(), &[self.0.clone()], blockhash)
            .map_err(|err| StepError::custom(err.to_string()))?;
        let signature = ctx
            .submitter()
            .send_and_confirm(&tx, ctx.commitment(), ctx.cancellation_token())
            .await?;
        Ok(StepResult::new(signature))
    }
}

/// Transaction step that cancels the flow it runs in
pub struct CancellingTransaction(pub CancellationToken);

#[async_trait]
impl CustomTransaction for CancellingTransaction {
    async fn execute(
        &self,
        ctx: &FlowContext,
    ) -> Result<StepResult, StepError> {
        self.0.cancel();
        NoopTransaction.execute(ctx).await
    }
}

pub struct FailingTransaction;

#[async_trait]
impl CustomTransaction for FailingTransaction {
    async fn execute(&self, _: &FlowContext) -> Result<StepResult, StepError> {
        Err(StepError::custom("program rejected the request"))
    }
}

/// Transaction step reporting its own instruction index
pub struct IndexedTransaction {
    pub signature: Signature,
    pub instruction_index: usize,
}

#[async_trait]
impl CustomTransaction for IndexedTransaction {
    async fn execute(&self, _: &FlowContext) -> Result<StepResult, StepError> {
        Ok(StepResult::batched(self.signature, self.instruction_index))
    }
}

/// Records like [RecordingHooks] and cancels the flow once unit
/// `unit_index` is confirmed
pub struct CancelAfterUnit {
    pub unit_index: usize,
    pub cancel: CancellationToken,
    pub recorder: Arc<RecordingHooks>,
}

#[async_trait]
impl FlowHooks for CancelAfterUnit {
    async fn on_step_start(&self, step_name: &str) {
        self.recorder.on_step_start(step_name).await;
    }

    async fn on_step_complete(&self, step_name: &str, result: &StepResult) {
        self.recorder.on_step_complete(step_name, result).await;
    }

    async fn on_step_error(&self, step_name: &str, error: &FlowExecutorError) {
        self.recorder.on_step_error(step_name, error).await;
    }

    async fn on_unit_state(
        &self,
        unit_index: usize,
        unit: &ExecutionUnit,
        state: UnitState,
    ) {
        self.recorder.on_unit_state(unit_index, unit, state).await;
        if unit_index == self.unit_index && state == UnitState::Confirmed {
            self.cancel.cancel();
        }
    }
}
