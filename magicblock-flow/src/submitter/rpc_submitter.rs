use async_trait::async_trait;
use log::{debug, error};
use magicblock_rpc_client::{
    utils::send_transaction_with_retries, MagicblockRpcClient,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    nonce::state::{State as NonceState, Versions as NonceVersions},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::SendConfig,
    submitter::{SubmitError, SubmitterResult, TransactionSubmitter},
    transaction::Lifetime,
};

/// Submits through a single RPC endpoint, resending the same signed
/// transaction on transient failures.
#[derive(Clone)]
pub struct RpcTransactionSubmitter {
    rpc_client: MagicblockRpcClient,
    send_config: SendConfig,
}

impl RpcTransactionSubmitter {
    pub fn new(
        rpc_client: MagicblockRpcClient,
        send_config: SendConfig,
    ) -> Self {
        Self {
            rpc_client,
            send_config,
        }
    }

    pub fn rpc_client(&self) -> &MagicblockRpcClient {
        &self.rpc_client
    }

    async fn fetch_nonce(
        &self,
        nonce_account: &Pubkey,
    ) -> SubmitterResult<Hash> {
        let account = self
            .rpc_client
            .get_account(nonce_account)
            .await?
            .ok_or(SubmitError::NonceAccountNotFound(*nonce_account))?;
        let versions: NonceVersions = bincode::deserialize(&account.data)
            .map_err(|_| SubmitError::InvalidNonceAccount(*nonce_account))?;
        match versions.state() {
            NonceState::Initialized(data) => Ok(data.blockhash()),
            NonceState::Uninitialized => {
                Err(SubmitError::InvalidNonceAccount(*nonce_account))
            }
        }
    }
}

#[async_trait]
impl TransactionSubmitter for RpcTransactionSubmitter {
    async fn resolve_lifetime(
        &self,
        lifetime: &Lifetime,
    ) -> SubmitterResult<Hash> {
        match lifetime {
            Lifetime::LatestBlockhash => {
                Ok(self.rpc_client.get_latest_blockhash().await?)
            }
            Lifetime::Blockhash(hash) => Ok(*hash),
            Lifetime::DurableNonce { nonce_account } => {
                self.fetch_nonce(nonce_account).await
            }
        }
    }

    async fn send_and_confirm(
        &self,
        transaction: &VersionedTransaction,
        commitment: CommitmentConfig,
        cancel: &CancellationToken,
    ) -> SubmitterResult<Signature> {
        let config = self.send_config.send_transaction_config(commitment);
        let rpc_client = &self.rpc_client;
        let config = &config;
        let send = send_transaction_with_retries(
            move || rpc_client.send_transaction(transaction, config),
            self.send_config.backoff_policy(),
            self.send_config.max_attempts,
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(
                    "Stopped waiting for transaction on {}",
                    rpc_client.url()
                );
                Err(SubmitError::Cancelled)
            }
            result = send => {
                result.map_err(|err| {
                    error!(
                        "Failed to land transaction on {}: {}",
                        rpc_client.url(),
                        err
                    );
                    SubmitError::from(err)
                })
            }
        }
    }
}
