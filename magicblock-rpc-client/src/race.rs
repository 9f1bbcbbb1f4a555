use std::future::Future;

use futures_util::stream::{FuturesUnordered, StreamExt};
use log::trace;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum RaceError<E> {
    #[error("No tasks to race")]
    NoTasks,
    #[error("Race was cancelled after {} failures", .0.len())]
    Cancelled(Vec<E>),
    #[error("All {} raced tasks failed", .0.len())]
    AllFailed(Vec<E>),
}

pub type RaceResult<T, E> = Result<T, RaceError<E>>;

/// Launches every task with a token shared by all of them and returns the
/// first success. The winner cancels the shared token so the remaining
/// tasks can stop early; they are dropped once this returns.
/// Cancelling `cancel` cancels the shared token as well.
pub async fn race<L, Fut, T, E>(
    launchers: impl IntoIterator<Item = L>,
    cancel: &CancellationToken,
) -> RaceResult<T, E>
where
    L: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let race_token = cancel.child_token();
    let mut tasks = launchers
        .into_iter()
        .map(|launch| launch(race_token.clone()))
        .collect::<FuturesUnordered<_>>();
    if tasks.is_empty() {
        return Err(RaceError::NoTasks);
    }

    let total = tasks.len();
    let mut errors = Vec::with_capacity(total);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                race_token.cancel();
                return Err(RaceError::Cancelled(errors));
            }
            next = tasks.next() => match next {
                Some(Ok(value)) => {
                    trace!(
                        "Race won after {} of {} tasks failed",
                        errors.len(),
                        total
                    );
                    race_token.cancel();
                    return Ok(value);
                }
                Some(Err(err)) => errors.push(err),
                None => return Err(RaceError::AllFailed(errors)),
            },
        }
    }
}
