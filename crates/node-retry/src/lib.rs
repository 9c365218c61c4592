// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A single generic retry-with-exponential-backoff combinator, wrapping
//! every remote primitive in the Source Client Pool (spec.md §4.1, §9
//! "Retry wrapper — do not inline retry logic into call sites").
//!
//! Grounded on the `backoff::future::retry` usage in
//! `sui-indexer-alt/src/ingestion/client.rs` (an example repo in the
//! retrieval pack): an unbounded `ExponentialBackoff` capped at a maximum
//! interval, with a `permanent`/`transient` split driven by the error's own
//! [`Classify`] impl instead of a one-off closure per call site.

use std::future::Future;
use std::time::Duration;

use backoff::{future::retry, Error as BackoffError, ExponentialBackoff};
use tokio_util::sync::CancellationToken;

/// Initial backoff interval (spec.md §4.1: "initial 1 s").
pub const INITIAL_INTERVAL: Duration = Duration::from_secs(1);
/// Backoff cap (spec.md §4.1 / §5: "capped at 5 min").
pub const MAX_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Implemented by every Source Client Pool error type so [`with_retry`] can
/// decide whether to keep retrying or give up. Terminal errors are
/// malformed responses, authentication failures, and "not found" where
/// absence is a valid, meaningful answer (spec.md §4.1).
pub trait Classify {
    fn is_terminal(&self) -> bool;
}

/// What [`with_retry`] returns when it stops retrying: either the caller's
/// cancellation token fired, or the wrapped call produced a terminal
/// error. Transient errors never escape this function — they are retried
/// forever, per spec.md §4.1 "unbounded attempts".
#[derive(Debug)]
pub enum RetryOutcome<E> {
    Cancelled,
    Error(E),
}

impl<E: std::fmt::Display> std::fmt::Display for RetryOutcome<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryOutcome::Cancelled => write!(f, "cancelled"),
            RetryOutcome::Error(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RetryOutcome<E> {}

fn backoff_policy() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: INITIAL_INTERVAL,
        max_interval: MAX_INTERVAL,
        // Unbounded: spec.md requires transient errors to be retried
        // indefinitely, never giving up on the caller's behalf.
        max_elapsed_time: None,
        ..Default::default()
    }
}

/// Retries `make_request` with exponential backoff until it succeeds,
/// returns a terminal error, or `cancel` fires. Every remote call in the
/// Source Client Pool should be wrapped in this, not in ad-hoc retry
/// loops (spec.md §9).
pub async fn with_retry<T, E, Fut, F>(
    cancel: &CancellationToken,
    make_request: F,
) -> Result<T, RetryOutcome<E>>
where
    F: FnMut() -> Fut,
    E: Classify + std::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_notify(cancel, make_request, || {}).await
}

/// As [`with_retry`], but invokes `on_retry` once per transient failure
/// before the backoff sleep — the hook callers use to drive the
/// `source_client_retries` counter (spec.md §1) without inlining retry
/// bookkeeping at every call site (spec.md §9 "Retry wrapper").
pub async fn with_retry_notify<T, E, Fut, F, N>(
    cancel: &CancellationToken,
    mut make_request: F,
    mut on_retry: N,
) -> Result<T, RetryOutcome<E>>
where
    F: FnMut() -> Fut,
    E: Classify + std::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
    N: FnMut(),
{
    let op = || async {
        if cancel.is_cancelled() {
            // Terminal from backoff's perspective: the grace window for
            // in-flight cancellation (spec.md §4.1) is enforced by the
            // caller via `tokio::select!`, not here.
            return Err(BackoffError::permanent(RetryOutcome::Cancelled));
        }
        match make_request().await {
            Ok(value) => Ok(value),
            Err(err) if err.is_terminal() => {
                Err(BackoffError::permanent(RetryOutcome::Error(err)))
            }
            Err(err) => {
                tracing::warn!(error = %err, "transient source-client error, retrying");
                on_retry();
                Err(BackoffError::transient(RetryOutcome::Error(err)))
            }
        }
    };

    retry(backoff_policy(), op).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestError {
        terminal: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (terminal={})", self.terminal)
        }
    }

    impl Classify for TestError {
        fn is_terminal(&self) -> bool {
            self.terminal
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let attempts = AtomicUsize::new(0);
        let cancel = CancellationToken::new();

        let result = with_retry(&cancel, || async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(TestError { terminal: false })
            } else {
                Ok(42)
            }
        })
        .await;

        assert!(matches!(result, Ok(42)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_errors_propagate_immediately() {
        let attempts = AtomicUsize::new(0);
        let cancel = CancellationToken::new();

        let result = with_retry(&cancel, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(TestError { terminal: true })
        })
        .await;

        assert!(matches!(result, Err(RetryOutcome::Error(TestError { terminal: true }))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_retrying() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = with_retry(&cancel, || async { Err::<(), _>(TestError { terminal: false }) }).await;

        assert!(matches!(result, Err(RetryOutcome::Cancelled)));
    }

    #[tokio::test]
    async fn notify_fires_once_per_transient_attempt_not_on_success_or_terminal() {
        let attempts = AtomicUsize::new(0);
        let notified = AtomicUsize::new(0);
        let cancel = CancellationToken::new();

        let result = with_retry_notify(
            &cancel,
            || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TestError { terminal: false })
                } else {
                    Ok(42)
                }
            },
            || {
                notified.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;

        assert!(matches!(result, Ok(42)));
        assert_eq!(notified.load(Ordering::SeqCst), 2, "the 2 transient attempts notify, the final success does not");
    }
}
