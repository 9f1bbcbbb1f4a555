use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::VersionedTransaction,
};
use tokio_util::sync::CancellationToken;

use crate::{
    context::{FlowContext, StepResult},
    error::{FlowErrorKind, StepCreationResult},
    executor::{FlowExecutorError, FlowHooks, UnitState},
    planner::ExecutionUnit,
    step::CustomTransaction,
    submitter::{SubmitError, SubmitterResult, TransactionSubmitter},
    transaction::Lifetime,
};

// -----------------
// InMemorySubmitter
// -----------------
/// Confirms every transaction it gets unless told to fail it.
/// Submissions are counted from zero in the order they arrive.
#[derive(Default)]
pub struct InMemorySubmitter {
    submitted: Mutex<Vec<VersionedTransaction>>,
    confirmed: Mutex<Vec<Signature>>,
    blockhashes: Mutex<Vec<Hash>>,
    failing_submissions: HashSet<usize>,
    nonces: HashMap<Pubkey, Hash>,
    delay: Option<Duration>,
}

impl InMemorySubmitter {
    pub fn fail_submission(mut self, index: usize) -> Self {
        self.failing_submissions.insert(index);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_nonce(mut self, nonce_account: Pubkey, nonce: Hash) -> Self {
        self.nonces.insert(nonce_account, nonce);
        self
    }

    /// Every transaction received, including failed ones
    pub fn submitted(&self) -> Vec<VersionedTransaction> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn confirmed(&self) -> Vec<Signature> {
        self.confirmed.lock().unwrap().clone()
    }

    /// Blockhashes handed out for [`Lifetime::LatestBlockhash`]
    pub fn blockhashes(&self) -> Vec<Hash> {
        self.blockhashes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionSubmitter for InMemorySubmitter {
    async fn resolve_lifetime(
        &self,
        lifetime: &Lifetime,
    ) -> SubmitterResult<Hash> {
        match lifetime {
            Lifetime::LatestBlockhash => {
                let hash = Hash::new_unique();
                self.blockhashes.lock().unwrap().push(hash);
                Ok(hash)
            }
            Lifetime::Blockhash(hash) => Ok(*hash),
            Lifetime::DurableNonce { nonce_account } => self
                .nonces
                .get(nonce_account)
                .copied()
                .ok_or(SubmitError::NonceAccountNotFound(*nonce_account)),
        }
    }

    async fn send_and_confirm(
        &self,
        transaction: &VersionedTransaction,
        _commitment: CommitmentConfig,
        cancel: &CancellationToken,
    ) -> SubmitterResult<Signature> {
        let index = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(transaction.clone());
            submitted.len() - 1
        };

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(SubmitError::Cancelled),
            }
        }
        if self.failing_submissions.contains(&index) {
            return Err(SubmitError::Rejected(format!(
                "submission {} failed",
                index
            )));
        }

        let signature = transaction.signatures[0];
        self.confirmed.lock().unwrap().push(signature);
        Ok(signature)
    }
}

// -----------------
// NoopTransaction
// -----------------
/// Transaction step that pretends to land a transaction
pub struct NoopTransaction;

#[async_trait]
impl CustomTransaction for NoopTransaction {
    async fn execute(
        &self,
        _ctx: &FlowContext,
    ) -> StepCreationResult<StepResult> {
        Ok(StepResult::new(Signature::new_unique()))
    }
}

// -----------------
// RecordingHooks
// -----------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    StepStart(String),
    StepComplete(String, StepResult),
    StepError(String, FlowErrorKind),
    UnitState(usize, UnitState),
}

#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<HookEvent>>,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started_steps(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HookEvent::StepStart(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn completed_steps(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HookEvent::StepComplete(name, _) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn failed_steps(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HookEvent::StepError(name, _) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn unit_states(&self, unit_index: usize) -> Vec<UnitState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HookEvent::UnitState(index, state) if index == unit_index => {
                    Some(state)
                }
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: HookEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl FlowHooks for RecordingHooks {
    async fn on_step_start(&self, step_name: &str) {
        self.record(HookEvent::StepStart(step_name.to_string()));
    }

    async fn on_step_complete(&self, step_name: &str, result: &StepResult) {
        self.record(HookEvent::StepComplete(step_name.to_string(), *result));
    }

    async fn on_step_error(&self, step_name: &str, error: &FlowExecutorError) {
        self.record(HookEvent::StepError(step_name.to_string(), error.kind()));
    }

    async fn on_unit_state(
        &self,
        unit_index: usize,
        _unit: &ExecutionUnit,
        state: UnitState,
    ) {
        self.record(HookEvent::UnitState(unit_index, state));
    }
}
