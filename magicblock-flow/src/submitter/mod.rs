use async_trait::async_trait;
use magicblock_rpc_client::MagicBlockRpcClientError;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::VersionedTransaction,
};
use tokio_util::sync::CancellationToken;

use crate::transaction::Lifetime;

mod multi_endpoint;
mod rpc_submitter;

pub use multi_endpoint::MultiEndpointSubmitter;
pub use rpc_submitter::RpcTransactionSubmitter;

/// Lands signed transactions on a cluster.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Hash a transaction with `lifetime` is signed against
    async fn resolve_lifetime(
        &self,
        lifetime: &Lifetime,
    ) -> SubmitterResult<Hash>;

    /// Submits `transaction` and waits until it reaches `commitment`.
    /// Returns early with [`SubmitError::Cancelled`] once `cancel` fires,
    /// the transaction may still land in that case.
    async fn send_and_confirm(
        &self,
        transaction: &VersionedTransaction,
        commitment: CommitmentConfig,
        cancel: &CancellationToken,
    ) -> SubmitterResult<Signature>;
}

#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    #[error("MagicBlockRpcClientError: {0}")]
    MagicBlockRpcClientError(#[from] MagicBlockRpcClientError),
    #[error("Nonce account {0} doesn't exist")]
    NonceAccountNotFound(Pubkey),
    #[error("Nonce account {0} isn't an initialized nonce account")]
    InvalidNonceAccount(Pubkey),
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("Submission was cancelled")]
    Cancelled,
    #[error("No endpoints configured")]
    NoEndpoints,
    #[error("All {} endpoints failed", .0.len())]
    AllEndpointsFailed(Vec<SubmitError>),
}

impl SubmitError {
    pub fn signature(&self) -> Option<Signature> {
        match self {
            Self::MagicBlockRpcClientError(err) => err.signature(),
            Self::AllEndpointsFailed(errors) => {
                errors.iter().find_map(Self::signature)
            }
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type SubmitterResult<T, E = SubmitError> = Result<T, E>;
