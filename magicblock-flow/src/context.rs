use std::{collections::HashMap, sync::Arc};

use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use tokio_util::sync::CancellationToken;

use crate::{error::StepError, submitter::TransactionSubmitter};

/// Outcome of a completed step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Signature of the transaction that carried the step
    pub signature: Signature,
    /// Position of the step's first instruction among the instructions
    /// packed into that transaction. Compute budget and nonce instructions
    /// prepended to every transaction aren't counted.
    /// Transaction steps set it themselves, if at all.
    pub instruction_index: Option<usize>,
}

impl StepResult {
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            instruction_index: None,
        }
    }

    pub fn batched(signature: Signature, instruction_index: usize) -> Self {
        Self {
            signature,
            instruction_index: Some(instruction_index),
        }
    }
}

/// Results of completed steps in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowResults {
    order: Vec<String>,
    results: HashMap<String, StepResult>,
}

impl FlowResults {
    pub fn get(&self, step_name: &str) -> Option<&StepResult> {
        self.results.get(step_name)
    }

    pub fn contains(&self, step_name: &str) -> bool {
        self.results.contains_key(step_name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StepResult)> {
        self.order
            .iter()
            .filter_map(|name| Some((name.as_str(), self.results.get(name)?)))
    }

    /// Distinct signatures in the order transactions were confirmed
    pub fn signatures(&self) -> Vec<Signature> {
        let mut signatures: Vec<Signature> = Vec::new();
        for (_, result) in self.iter() {
            if !signatures.contains(&result.signature) {
                signatures.push(result.signature);
            }
        }
        signatures
    }

    /// Steps complete once, a second insert for the same name is ignored.
    pub(crate) fn insert(&mut self, step_name: &str, result: StepResult) {
        if self.results.contains_key(step_name) {
            return;
        }
        self.order.push(step_name.to_string());
        self.results.insert(step_name.to_string(), result);
    }
}

/// State visible to instruction creators and transaction steps.
/// Only results of steps that already completed are present.
pub struct FlowContext {
    results: FlowResults,
    authority: Arc<Keypair>,
    submitter: Arc<dyn TransactionSubmitter>,
    commitment: CommitmentConfig,
    cancel: CancellationToken,
}

impl FlowContext {
    pub fn new(
        authority: Arc<Keypair>,
        submitter: Arc<dyn TransactionSubmitter>,
        commitment: CommitmentConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            results: FlowResults::default(),
            authority,
            submitter,
            commitment,
            cancel,
        }
    }

    pub fn get(&self, step_name: &str) -> Option<&StepResult> {
        self.results.get(step_name)
    }

    /// Like [`FlowContext::get`] but fails when the result is missing
    pub fn require(&self, step_name: &str) -> Result<&StepResult, StepError> {
        self.results
            .get(step_name)
            .ok_or_else(|| StepError::MissingResult(step_name.to_string()))
    }

    pub fn results(&self) -> &FlowResults {
        &self.results
    }

    pub fn authority(&self) -> &Keypair {
        &self.authority
    }

    pub fn fee_payer(&self) -> Pubkey {
        self.authority.pubkey()
    }

    pub fn submitter(&self) -> &Arc<dyn TransactionSubmitter> {
        &self.submitter
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn insert(&mut self, step_name: &str, result: StepResult) {
        self.results.insert(step_name, result);
    }

    pub(crate) fn into_results(self) -> FlowResults {
        self.results
    }
}
