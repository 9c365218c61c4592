// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The Data Source (spec.md §4.2): a stateful per-instance producer that
//! drives a Source Client Pool client and emits ordered [`TaskBatch`]es.
//! One enum-dispatched implementation per network family, all behind the
//! single [`DataSource`] trait SPEC_FULL.md §4.2 specifies.

mod activitypub;
mod arweave;
mod error;
mod evm;
mod farcaster;
mod rss;

pub use activitypub::ActivityPubDataSource;
pub use arweave::ArweaveDataSource;
pub use error::DataSourceError;
pub use evm::EvmDataSource;
pub use farcaster::FarcasterDataSource;
pub use rss::RssDataSource;

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use node_metrics::MeteredSender;
use node_metrics::SourceClientMetrics;
use node_source_clients::ClientError;
use node_types::{Network, Task};
use tokio_util::sync::CancellationToken;

/// One atomic unit of forward progress: the tasks pulled in this
/// iteration of the pump loop, and the State the Data Source will have
/// reached once every task in the batch is committed (spec.md §4.2 step
/// k "Atomically advance State to end"). The Indexer Engine only
/// persists `state` after `tasks` has been fully transformed and
/// sinked, never before (spec.md §4.4 "Atomicity").
#[derive(Debug, Clone)]
pub struct TaskBatch {
    pub tasks: Vec<Task>,
    pub state: Vec<u8>,
}

/// A stateful per-instance producer (spec.md §4.2). `run` owns the pump
/// loop: it runs until `cancel` fires or a terminal error occurs, never
/// returning transient failures — those are absorbed internally by
/// `node_retry::with_retry` at every remote call site (spec.md §4.2
/// "Failure semantics", §7 Propagation).
#[async_trait]
pub trait DataSource: Send + Sync {
    fn network(&self) -> Network;

    /// Current in-memory State snapshot (spec.md §4.2 "state() → opaque
    /// bytes"). Reflects only what has actually been committed — updated
    /// after a batch is handed off, never while a batch is still being
    /// assembled (spec.md §4.4 "At-most-once forward progress").
    fn state(&self) -> Vec<u8>;

    /// Run the pump loop, sending batches on `tasks`. Capacity of `tasks`
    /// is the caller's concern (spec.md §4.4: "capacity = 1 — strict
    /// one-batch-in-flight").
    async fn run(
        self: Box<Self>,
        tasks: MeteredSender<TaskBatch>,
        cancel: CancellationToken,
    ) -> Result<(), DataSourceError>;
}

/// Encodes a block height as the opaque `State` bytes persisted in a
/// `Checkpoint` (spec.md §9 "Opaque State... each Data Source defines its
/// own encode/decode").
pub(crate) fn encode_height(height: u64) -> Vec<u8> {
    height.to_le_bytes().to_vec()
}

/// Decodes a block-height State, defaulting to 0 for an empty (first-run)
/// checkpoint (spec.md §4.2 step 1: "empty State ⇒ start at configured
/// block_start or genesis").
pub(crate) fn decode_height(state: &[u8]) -> u64 {
    if state.len() != 8 {
        return 0;
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(state);
    u64::from_le_bytes(bytes)
}

/// Encodes a message-stream cursor (Farcaster page token, ActivityPub
/// next-page URL, RSS last-seen guid) as UTF-8 State bytes.
pub(crate) fn encode_cursor(cursor: &str) -> Vec<u8> {
    cursor.as_bytes().to_vec()
}

pub(crate) fn decode_cursor(state: &[u8]) -> Option<String> {
    if state.is_empty() {
        return None;
    }
    String::from_utf8(state.to_vec()).ok()
}

/// Wraps one remote call in `node_retry::with_retry` and, when a
/// [`SourceClientMetrics`] handle is configured, records its latency and
/// bumps `source_client_retries` once per transient attempt (spec.md
/// §4.1 "the retry/concurrency/cancellation wrapper ... applied at every
/// call site"). Transient errors are retried silently; only the terminal
/// outcome is ever returned here.
pub(crate) async fn call<T, Fut, F>(
    network: Network,
    method: &'static str,
    metrics: Option<&SourceClientMetrics>,
    cancel: &CancellationToken,
    make_request: F,
) -> Result<T, DataSourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let start = Instant::now();
    let retries_counter = metrics.map(|m| m.retries.with_label_values(&[&network.to_string(), method]));
    let result = node_retry::with_retry_notify(cancel, make_request, || {
        if let Some(counter) = &retries_counter {
            counter.inc();
        }
    })
    .await;
    if let Some(metrics) = metrics {
        metrics
            .request_latency
            .with_label_values(&[&network.to_string(), method])
            .observe(start.elapsed().as_secs_f64());
    }
    result.map_err(DataSourceError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_source_clients::ClientError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn height_round_trips() {
        assert_eq!(decode_height(&encode_height(17459684)), 17459684);
        assert_eq!(decode_height(&[]), 0);
    }

    #[test]
    fn cursor_round_trips() {
        assert_eq!(decode_cursor(&encode_cursor("abc")).as_deref(), Some("abc"));
        assert_eq!(decode_cursor(&[]), None);
    }

    /// SPEC_FULL §1 names `source_client_retries` as a live export; each
    /// transient attempt `call()` absorbs must bump it, labelled by
    /// network and method.
    #[tokio::test]
    async fn call_increments_the_retries_counter_once_per_transient_attempt() {
        let registry = prometheus::Registry::new();
        let metrics = SourceClientMetrics::new(&registry);
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result: Result<u64, DataSourceError> = call(Network::ArweaveMainnet, "head", Some(&metrics), &cancel, || async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ClientError::Transport("timeout".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(
            metrics
                .retries
                .with_label_values(&[&Network::ArweaveMainnet.to_string(), "head"])
                .get(),
            2
        );
    }
}
