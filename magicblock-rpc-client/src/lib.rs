use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::*;
use solana_rpc_client::{
    nonblocking::rpc_client::RpcClient, rpc_client::SerializableTransaction,
};
use solana_rpc_client_api::{
    client_error::ErrorKind as RpcClientErrorKind,
    config::RpcSendTransactionConfig, request::RpcError,
};
use solana_sdk::{
    account::Account,
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{self, TransactionError},
};
use solana_transaction_status_client_types::UiTransactionEncoding;

pub mod race;
pub mod utils;

/// The encoding to use when sending transactions
pub const SEND_TRANSACTION_ENCODING: UiTransactionEncoding =
    UiTransactionEncoding::Base64;

/// The configuration to use when sending transactions
pub const SEND_TRANSACTION_CONFIG: RpcSendTransactionConfig =
    RpcSendTransactionConfig {
        preflight_commitment: None,
        skip_preflight: true,
        encoding: Some(SEND_TRANSACTION_ENCODING),
        max_retries: None,
        min_context_slot: None,
    };

// -----------------
// MagicBlockRpcClientError
// -----------------
#[derive(Debug, thiserror::Error)]
pub enum MagicBlockRpcClientError {
    #[error("RPC Client error: {0}")]
    RpcClientError(#[from] solana_rpc_client_api::client_error::Error),

    #[error("Error getting blockhash: {0} ({0:?})")]
    GetLatestBlockhash(solana_rpc_client_api::client_error::Error),

    #[error("Error sending transaction: {0} ({0:?})")]
    SendTransaction(solana_rpc_client_api::client_error::Error),

    #[error("Error getting signature status for: {0} {1}")]
    CannotGetTransactionSignatureStatus(Signature, String),

    #[error(
        "Error confirming signature status of {0} at desired commitment level {1}"
    )]
    CannotConfirmTransactionSignatureStatus(Signature, CommitmentLevel),

    #[error("Sent transaction {1} but got error: {0:?}")]
    SentTransactionError(TransactionError, Signature),
}

impl MagicBlockRpcClientError {
    /// Returns the signature of the transaction that caused the error
    /// if available.
    pub fn signature(&self) -> Option<Signature> {
        use MagicBlockRpcClientError::*;
        match self {
            CannotGetTransactionSignatureStatus(sig, _)
            | SentTransactionError(_, sig)
            | CannotConfirmTransactionSignatureStatus(sig, _) => Some(*sig),
            _ => None,
        }
    }

    /// Whether resending the same transaction may succeed.
    /// A transaction that landed with an error is final, as are
    /// transport errors other than IO.
    pub fn is_retryable(&self) -> bool {
        use MagicBlockRpcClientError::*;
        match self {
            RpcClientError(err)
            | SendTransaction(err)
            | GetLatestBlockhash(err) => {
                matches!(err.kind(), RpcClientErrorKind::Io(_))
            }
            CannotGetTransactionSignatureStatus(..)
            | CannotConfirmTransactionSignatureStatus(..) => true,
            SentTransactionError(..) => false,
        }
    }
}

pub type MagicBlockRpcClientResult<T> =
    std::result::Result<T, MagicBlockRpcClientError>;

// -----------------
// SendAndConfirmTransaction Config and Outcome
// -----------------

/// How long [MagicblockRpcClient::send_transaction] polls for the status
/// of a sent transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicBlockSendTransactionConfig {
    /// Grace period for a blockhash the cluster hasn't seen yet
    pub blockhash_valid_timeout: Duration,
    /// Upper bound for reaching processed status
    pub processed_timeout: Duration,
    /// Upper bound for reaching `commitment` once processed.
    /// `None` when `commitment` is the processed level.
    pub commitment_timeout: Option<Duration>,
    pub check_interval: Duration,
    pub commitment: CommitmentConfig,
}

const DEFAULT_BLOCKHASH_VALID_TIMEOUT: Duration =
    Duration::from_millis(2_000);

impl MagicBlockSendTransactionConfig {
    /// Waits for processed status and then for `commitment` unless it is
    /// the processed level itself.
    pub fn ensure_commitment(
        commitment: CommitmentConfig,
        processed_timeout: Duration,
        commitment_timeout: Duration,
        check_interval: Duration,
    ) -> Self {
        Self {
            blockhash_valid_timeout: DEFAULT_BLOCKHASH_VALID_TIMEOUT,
            processed_timeout,
            commitment_timeout: commitment
                .is_at_least_confirmed()
                .then_some(commitment_timeout),
            check_interval,
            commitment,
        }
    }
}

#[derive(Debug)]
pub struct MagicBlockSendTransactionOutcome {
    signature: Signature,
    /// Error the transaction landed with at the requested commitment
    error: Option<TransactionError>,
}

impl MagicBlockSendTransactionOutcome {
    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub fn into_result(self) -> MagicBlockRpcClientResult<Signature> {
        match self.error {
            Some(err) => Err(MagicBlockRpcClientError::SentTransactionError(
                err,
                self.signature,
            )),
            None => Ok(self.signature),
        }
    }
}

// -----------------
// MagicBlockRpcClient
// -----------------

/// Wraps a [RpcClient] to send transactions and poll for their status.
#[derive(Clone)]
pub struct MagicblockRpcClient {
    client: Arc<RpcClient>,
}

impl MagicblockRpcClient {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }

    pub async fn get_latest_blockhash(
        &self,
    ) -> MagicBlockRpcClientResult<Hash> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(MagicBlockRpcClientError::GetLatestBlockhash)
    }

    /// `None` if the account doesn't exist
    pub async fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> MagicBlockRpcClientResult<Option<Account>> {
        let err = match self.client.get_account(pubkey).await {
            Ok(acc) => return Ok(Some(acc)),
            Err(err) => err,
        };
        if let RpcClientErrorKind::RpcError(RpcError::ForUser(msg)) =
            err.kind()
        {
            if msg.starts_with("AccountNotFound") {
                return Ok(None);
            }
        }
        Err(MagicBlockRpcClientError::RpcClientError(err))
    }

    /// Sends `tx` without preflight, waits for processed status and then
    /// for the configured commitment.
    pub async fn send_transaction(
        &self,
        tx: &impl SerializableTransaction,
        config: &MagicBlockSendTransactionConfig,
    ) -> MagicBlockRpcClientResult<MagicBlockSendTransactionOutcome> {
        let signature = self
            .client
            .send_transaction_with_config(tx, SEND_TRANSACTION_CONFIG)
            .await
            .map_err(MagicBlockRpcClientError::SendTransaction)?;

        let processed = self
            .wait_for_processed_status(
                &signature,
                tx.get_recent_blockhash(),
                config,
            )
            .await?;
        if let Err(err) = processed {
            return Err(MagicBlockRpcClientError::SentTransactionError(
                err, signature,
            ));
        }

        let error = match config.commitment_timeout {
            Some(timeout) => self
                .wait_for_confirmed_status(
                    &signature,
                    config.commitment,
                    timeout,
                    config.check_interval,
                )
                .await?
                .err(),
            None => None,
        };
        Ok(MagicBlockSendTransactionOutcome { signature, error })
    }

    /// Polls until `signature` has a processed status. While the status is
    /// missing and `recent_blockhash` isn't known to the cluster yet, the
    /// poll keeps going for at most `blockhash_valid_timeout`.
    pub async fn wait_for_processed_status(
        &self,
        signature: &Signature,
        recent_blockhash: &Hash,
        config: &MagicBlockSendTransactionConfig,
    ) -> MagicBlockRpcClientResult<transaction::Result<()>> {
        let status_missing = |reason: &str| {
            MagicBlockRpcClientError::CannotGetTransactionSignatureStatus(
                *signature,
                reason.to_string(),
            )
        };

        let start = Instant::now();
        let mut last_err = status_missing("blockhash was not found");
        while start.elapsed() < config.processed_timeout {
            if let Some(status) = self
                .client
                .get_signature_status_with_commitment(
                    signature,
                    CommitmentConfig::processed(),
                )
                .await?
            {
                return Ok(status);
            }

            let blockhash_found = self
                .client
                .is_blockhash_valid(
                    recent_blockhash,
                    CommitmentConfig::processed(),
                )
                .await?;
            if blockhash_found {
                last_err = status_missing("blockhash was found");
            } else if start.elapsed() < config.blockhash_valid_timeout {
                trace!("Blockhash {} not valid yet", recent_blockhash);
            } else {
                last_err = status_missing("blockhash was not found");
            }
            tokio::time::sleep(config.check_interval).await;
        }

        Err(last_err)
    }

    /// Polls until `signature` reaches `commitment` or `timeout` passes
    pub async fn wait_for_confirmed_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
        timeout: Duration,
        check_interval: Duration,
    ) -> MagicBlockRpcClientResult<transaction::Result<()>> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Some(status) = self
                .client
                .get_signature_status_with_commitment(signature, commitment)
                .await?
            {
                return Ok(status);
            }
            tokio::time::sleep(check_interval).await;
        }

        Err(
            MagicBlockRpcClientError::CannotConfirmTransactionSignatureStatus(
                *signature,
                commitment.commitment,
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use solana_sdk::{
        commitment_config::CommitmentConfig, instruction::InstructionError,
        signature::Signature, transaction::TransactionError,
    };

    use super::*;

    #[test]
    fn test_sent_transaction_error_is_final() {
        let sig = Signature::new_unique();
        let err = MagicBlockRpcClientError::SentTransactionError(
            TransactionError::InstructionError(0, InstructionError::Custom(1)),
            sig,
        );
        assert!(!err.is_retryable());
        assert_eq!(err.signature(), Some(sig));
    }

    #[test]
    fn test_status_errors_are_retryable() {
        let sig = Signature::new_unique();
        let err =
            MagicBlockRpcClientError::CannotConfirmTransactionSignatureStatus(
                sig,
                CommitmentLevel::Confirmed,
            );
        assert!(err.is_retryable());
        assert_eq!(err.signature(), Some(sig));
    }

    #[test]
    fn test_ensure_commitment_skips_wait_for_processed() {
        let config = MagicBlockSendTransactionConfig::ensure_commitment(
            CommitmentConfig::processed(),
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_millis(10),
        );
        assert_eq!(config.commitment_timeout, None);
        assert_eq!(config.processed_timeout, Duration::from_secs(1));

        let config = MagicBlockSendTransactionConfig::ensure_commitment(
            CommitmentConfig::finalized(),
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_millis(10),
        );
        assert_eq!(config.commitment_timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.commitment, CommitmentConfig::finalized());
    }

    #[test]
    fn test_outcome_into_result() {
        let signature = Signature::new_unique();
        let outcome = MagicBlockSendTransactionOutcome {
            signature,
            error: None,
        };
        assert_eq!(outcome.signature(), signature);
        assert_eq!(outcome.into_result().unwrap(), signature);

        let outcome = MagicBlockSendTransactionOutcome {
            signature,
            error: Some(TransactionError::AccountInUse),
        };
        assert!(matches!(
            outcome.into_result(),
            Err(MagicBlockRpcClientError::SentTransactionError(
                TransactionError::AccountInUse,
                sig
            )) if sig == signature
        ));
    }
}
