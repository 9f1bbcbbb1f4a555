use std::{path::Path, time::Duration};

use magicblock_rpc_client::{
    utils::BackoffPolicy, MagicBlockSendTransactionConfig,
};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;

use crate::{
    compute_budget::ComputeBudgetConfig,
    consts::{
        DEFAULT_BASE_DELAY_MS, DEFAULT_CHECK_INTERVAL_MS,
        DEFAULT_COMMITMENT_TIMEOUT_MS, DEFAULT_MAX_DELAY_MS,
        DEFAULT_MAX_SEND_ATTEMPTS, DEFAULT_PROCESSED_TIMEOUT_MS,
        MAX_TRANSACTION_SIZE,
    },
    planner::ExecutionStrategy,
};

#[derive(thiserror::Error, Debug)]
pub enum FlowConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("size-ceiling must be greater than zero")]
    InvalidSizeCeiling,
    #[error("send.max-attempts must be greater than zero")]
    InvalidMaxAttempts,
}

pub type FlowConfigResult<T, E = FlowConfigError> = Result<T, E>;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl From<Commitment> for CommitmentConfig {
    fn from(value: Commitment) -> Self {
        match value {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SendConfig {
    /// How many times the same signed transaction is sent before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_processed_timeout_ms")]
    pub processed_timeout_ms: u64,
    /// Time to reach the requested commitment once processed.
    #[serde(default = "default_commitment_timeout_ms")]
    pub commitment_timeout_ms: u64,
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            processed_timeout_ms: default_processed_timeout_ms(),
            commitment_timeout_ms: default_commitment_timeout_ms(),
            check_interval_ms: default_check_interval_ms(),
        }
    }
}

impl SendConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }

    pub fn send_transaction_config(
        &self,
        commitment: CommitmentConfig,
    ) -> MagicBlockSendTransactionConfig {
        MagicBlockSendTransactionConfig::ensure_commitment(
            commitment,
            Duration::from_millis(self.processed_timeout_ms),
            Duration::from_millis(self.commitment_timeout_ms),
            Duration::from_millis(self.check_interval_ms),
        )
    }
}

/// Configuration of a [`crate::executor::FlowExecutor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FlowConfig {
    /// Maximum serialized transaction size in bytes.
    #[serde(default = "default_size_ceiling")]
    pub size_ceiling: usize,
    /// Strategy used when a call doesn't pick one.
    #[serde(default)]
    pub strategy: ExecutionStrategy,
    /// Commitment used when a call doesn't pick one.
    #[serde(default)]
    pub commitment: Commitment,
    #[serde(default)]
    pub compute_budget: ComputeBudgetConfig,
    #[serde(default)]
    pub send: SendConfig,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            size_ceiling: default_size_ceiling(),
            strategy: ExecutionStrategy::default(),
            commitment: Commitment::default(),
            compute_budget: ComputeBudgetConfig::default(),
            send: SendConfig::default(),
        }
    }
}

impl FlowConfig {
    pub fn try_load_from_file(
        path: impl AsRef<Path>,
    ) -> FlowConfigResult<Self> {
        let toml = std::fs::read_to_string(path)?;
        Self::try_from_toml(&toml)
    }

    pub fn try_from_toml(toml: &str) -> FlowConfigResult<Self> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FlowConfigResult<()> {
        if self.size_ceiling == 0 {
            return Err(FlowConfigError::InvalidSizeCeiling);
        }
        if self.send.max_attempts == 0 {
            return Err(FlowConfigError::InvalidMaxAttempts);
        }
        Ok(())
    }
}

fn default_size_ceiling() -> usize {
    MAX_TRANSACTION_SIZE
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_SEND_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

fn default_processed_timeout_ms() -> u64 {
    DEFAULT_PROCESSED_TIMEOUT_MS
}

fn default_commitment_timeout_ms() -> u64 {
    DEFAULT_COMMITMENT_TIMEOUT_MS
}

fn default_check_interval_ms() -> u64 {
    DEFAULT_CHECK_INTERVAL_MS
}
