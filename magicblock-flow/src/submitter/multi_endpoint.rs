use std::sync::Arc;

use async_trait::async_trait;
use log::{trace, warn};
use magicblock_rpc_client::race::{race, RaceError};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, signature::Signature,
    transaction::VersionedTransaction,
};
use tokio_util::sync::CancellationToken;

use crate::{
    submitter::{SubmitError, SubmitterResult, TransactionSubmitter},
    transaction::Lifetime,
};

/// Sends the same signed transaction through every endpoint at once
/// and returns as soon as one of them confirms it.
pub struct MultiEndpointSubmitter {
    endpoints: Vec<Arc<dyn TransactionSubmitter>>,
}

impl MultiEndpointSubmitter {
    pub fn new(endpoints: Vec<Arc<dyn TransactionSubmitter>>) -> Self {
        Self { endpoints }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[async_trait]
impl TransactionSubmitter for MultiEndpointSubmitter {
    /// Asks endpoints in order, the first answer is used
    async fn resolve_lifetime(
        &self,
        lifetime: &Lifetime,
    ) -> SubmitterResult<Hash> {
        let mut errors = Vec::new();
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            match endpoint.resolve_lifetime(lifetime).await {
                Ok(hash) => return Ok(hash),
                Err(err) => {
                    warn!("Endpoint {} failed to resolve lifetime: {}", i, err);
                    errors.push(err);
                }
            }
        }

        if errors.is_empty() {
            Err(SubmitError::NoEndpoints)
        } else {
            Err(SubmitError::AllEndpointsFailed(errors))
        }
    }

    async fn send_and_confirm(
        &self,
        transaction: &VersionedTransaction,
        commitment: CommitmentConfig,
        cancel: &CancellationToken,
    ) -> SubmitterResult<Signature> {
        let launchers = self.endpoints.iter().map(|endpoint| {
            move |token: CancellationToken| async move {
                endpoint
                    .send_and_confirm(transaction, commitment, &token)
                    .await
            }
        });

        match race(launchers, cancel).await {
            Ok(signature) => Ok(signature),
            Err(RaceError::NoTasks) => Err(SubmitError::NoEndpoints),
            Err(RaceError::Cancelled(errors)) => {
                trace!("Cancelled after {} endpoints failed", errors.len());
                Err(SubmitError::Cancelled)
            }
            Err(RaceError::AllFailed(errors)) => {
                Err(SubmitError::AllEndpointsFailed(errors))
            }
        }
    }
}
