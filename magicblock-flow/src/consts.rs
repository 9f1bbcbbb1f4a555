use solana_sdk::packet::PACKET_DATA_SIZE;

/// Maximum size of a serialized transaction the cluster accepts
pub const MAX_TRANSACTION_SIZE: usize = PACKET_DATA_SIZE;

pub(crate) const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 5;
pub(crate) const DEFAULT_BASE_DELAY_MS: u64 = 500;
pub(crate) const DEFAULT_MAX_DELAY_MS: u64 = 8_000;
// Matches the time a busy validator may take to report a processed status
pub(crate) const DEFAULT_PROCESSED_TIMEOUT_MS: u64 = 50_000;
pub(crate) const DEFAULT_COMMITMENT_TIMEOUT_MS: u64 = 8_000;
pub(crate) const DEFAULT_CHECK_INTERVAL_MS: u64 = 400;
