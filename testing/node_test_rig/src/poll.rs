//! The polling primitive behind every wait routine in this crate.
//!
//! One query is issued per tick. The query decides how each outcome is
//! classified: `Ok(Some(_))` resolves the poll, `Ok(None)` means "not ready
//! yet, ask again next tick", and `Err(_)` is terminal. Call sites map
//! failures they consider retryable (a 404 from a syncing node, a block that
//! vanished in a reorg) into `Ok(None)` before they reach this loop, so the
//! retry policy is explicit at every site instead of baked in here.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, PartialEq, Eq)]
pub enum PollError<E> {
    /// The caller's cancellation token fired before the condition held.
    Cancelled,
    /// The query failed terminally.
    Query(E),
}

/// Polls `query` once per `tick` until it yields a value, fails terminally,
/// or `token` is cancelled.
///
/// The first query fires a full `tick` after entry, matching the cadence of a
/// chain that produces at most one block per slot. Cancellation is checked
/// ahead of the timer on every iteration; no query is issued after the token
/// fires.
pub async fn poll_until<T, E, F, Fut>(
    tick: Duration,
    token: &CancellationToken,
    mut query: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let mut interval = interval_at(Instant::now() + tick, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PollError::Cancelled),
            _ = interval.tick() => match query().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => return Err(PollError::Query(e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TICK: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn resolves_on_first_success() {
        let polls = AtomicUsize::new(0);
        let token = CancellationToken::new();

        let result: Result<usize, PollError<()>> = poll_until(TICK, &token, || {
            let count = polls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if count < 3 {
                    Ok(None)
                } else {
                    Ok(Some(count))
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_error_stops_polling() {
        let polls = AtomicUsize::new(0);
        let token = CancellationToken::new();

        let result: Result<(), PollError<&str>> = poll_until(TICK, &token, || {
            polls.fetch_add(1, Ordering::SeqCst);
            async { Err("gone") }
        })
        .await;

        assert_eq!(result, Err(PollError::Query("gone")));
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_before_the_first_tick_issues_no_query() {
        let polls = AtomicUsize::new(0);
        let token = CancellationToken::new();
        token.cancel();

        let result: Result<(), PollError<()>> = poll_until(TICK, &token, || {
            polls.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
        .await;

        assert_eq!(result, Err(PollError::Cancelled));
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_mid_poll_stops_the_ticks() {
        let polls = std::sync::Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                // Fires between the second and third tick.
                tokio::time::sleep(TICK * 5 / 2).await;
                token.cancel();
            })
        };

        let result: Result<(), PollError<()>> = poll_until(TICK, &token, || {
            polls.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
        .await;

        canceller.await.unwrap();
        assert_eq!(result, Err(PollError::Cancelled));
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn one_query_per_tick() {
        let token = CancellationToken::new();
        let polls = AtomicUsize::new(0);
        let started = Instant::now();

        let _: Result<(), PollError<()>> = poll_until(TICK, &token, || {
            let count = polls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if count == 4 {
                    Ok(Some(()))
                } else {
                    Ok(None)
                }
            }
        })
        .await;

        // Four ticks of one second each, the first after a full period.
        assert_eq!(started.elapsed(), TICK * 4);
    }
}
