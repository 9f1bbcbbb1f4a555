use std::{future::Future, time::Duration};

use log::{trace, warn};
use solana_sdk::signature::Signature;
use tokio::time::sleep;

use crate::{MagicBlockRpcClientError, MagicBlockSendTransactionOutcome};

/// Exponential backoff capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(8_000),
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait after the failed `attempt` (1-based) before the next one
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Sends using `make_send_fut` until it succeeds, fails with
/// an error that isn't retryable or `max_attempts` is reached.
/// The future is expected to resend the same signed transaction,
/// so a retry never lands a second transaction.
pub async fn send_transaction_with_retries<F, Fut>(
    make_send_fut: F,
    policy: BackoffPolicy,
    max_attempts: u32,
) -> Result<Signature, MagicBlockRpcClientError>
where
    F: Fn() -> Fut,
    Fut: Future<
        Output = Result<
            MagicBlockSendTransactionOutcome,
            MagicBlockRpcClientError,
        >,
    >,
{
    let mut attempt = 0;
    loop {
        attempt += 1;

        let err = match make_send_fut()
            .await
            .and_then(|outcome| outcome.into_result())
        {
            Ok(signature) => return Ok(signature),
            Err(err) => err,
        };

        if !err.is_retryable() {
            trace!("Not retrying send after attempt {}: {}", attempt, err);
            return Err(err);
        }
        if attempt >= max_attempts {
            warn!(
                "Giving up on transaction after {} attempts: {}",
                attempt, err
            );
            return Err(err);
        }

        let delay = policy.delay(attempt);
        warn!(
            "Send attempt {} failed, retrying in {:?}: {}",
            attempt, delay, err
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use assert_matches::assert_matches;
    use solana_sdk::{
        commitment_config::CommitmentLevel, transaction::TransactionError,
    };

    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn fast_policy() -> BackoffPolicy {
        BackoffPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let policy = BackoffPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1_000),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
        assert_eq!(policy.delay(4), Duration::from_millis(800));
        assert_eq!(policy.delay(5), Duration::from_millis(1_000));
        assert_eq!(policy.delay(u32::MAX), Duration::from_millis(1_000));
    }

    #[test]
    fn test_backoff_attempt_zero_is_base() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), policy.base_delay);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        init_logger();
        let calls = Arc::new(AtomicU32::new(0));
        let signature = Signature::new_unique();
        let result = send_transaction_with_retries(
            || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(MagicBlockRpcClientError::CannotConfirmTransactionSignatureStatus(
                            signature,
                            CommitmentLevel::Confirmed,
                        ))
                    } else {
                        Ok(MagicBlockSendTransactionOutcome {
                            signature,
                            error: None,
                        })
                    }
                }
            },
            fast_policy(),
            5,
        )
        .await;

        assert_eq!(result.unwrap(), signature);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_landed_error_is_not_retried() {
        init_logger();
        let calls = Arc::new(AtomicU32::new(0));
        let signature = Signature::new_unique();
        let result = send_transaction_with_retries(
            || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(MagicBlockSendTransactionOutcome {
                        signature,
                        error: Some(TransactionError::AccountInUse),
                    })
                }
            },
            fast_policy(),
            5,
        )
        .await;

        assert_matches!(
            result,
            Err(MagicBlockRpcClientError::SentTransactionError(
                TransactionError::AccountInUse,
                _
            ))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        init_logger();
        let calls = Arc::new(AtomicU32::new(0));
        let signature = Signature::new_unique();
        let result = send_transaction_with_retries(
            || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(MagicBlockRpcClientError::CannotGetTransactionSignatureStatus(
                        signature,
                        "timed out".to_string(),
                    ))
                }
            },
            fast_policy(),
            3,
        )
        .await;

        assert_matches!(
            result,
            Err(MagicBlockRpcClientError::CannotGetTransactionSignatureStatus(
                ..
            ))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
