// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The Worker contract (spec.md §4.3): a stateless per-protocol
//! transformer from a raw [`node_types::Task`] to a canonical
//! [`node_types::Activity`].

mod address;
mod arweave_bundle_fallback;
mod arweave_native;
mod kiwistand;
mod optimism;
pub mod token;

use node_types::{Filter, Network, Platform, Tag, Task, Type};
use thiserror::Error;

pub use arweave_bundle_fallback::ArweaveBundleFallbackWorker;
pub use arweave_native::ArweaveNativeTransferWorker;
pub use kiwistand::KiwistandWorker;
pub use optimism::OptimismBridgeWorker;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("task payload variant does not match worker {worker}: {task_id}")]
    WrongPayload { worker: &'static str, task_id: String },
    #[error("no event in task matched {worker}'s transform rules: {task_id}")]
    NoMatchingEvent { worker: &'static str, task_id: String },
}

/// Stateless per-protocol transformer (spec.md §4.3). Implementations must
/// not hold per-task mutable state; the only state allowed is read-through
/// caches such as a token metadata lookup (spec.md §4.3 "memoized").
pub trait Worker: Send + Sync {
    fn name(&self) -> &'static str;
    fn platform(&self) -> Platform;
    fn networks(&self) -> &[Network];
    fn tags(&self) -> &[Tag];
    fn types(&self) -> &[Type];

    /// Declares address/topic/owner predicates so the Data Source can
    /// prune before a task ever reaches [`Worker::matches`].
    fn filter(&self) -> Filter;

    /// Fast structural check: does *any* of the task's constituent
    /// signals satisfy this worker's event predicates (spec.md §4.3
    /// "Matching rules")? Must imply `self.filter().admits(task)`
    /// (spec.md §8 invariant 6).
    fn matches(&self, task: &Task) -> bool;

    /// Parses a task this worker has already matched into the canonical
    /// model. A task of the wrong payload variant is a programmer error —
    /// implementations may panic (spec.md §4.3 "A malformed task... is a
    /// programmer error and panics the worker contract check").
    fn transform(&self, task: &Task) -> Result<node_types::Activity, WorkerError>;
}

/// Built at process startup from the configured instance list: one worker
/// behind an `Arc` per `(network, worker name)` so the Indexer Engine can
/// hand off without re-constructing workers per task (spec.md §4.4 step 1).
pub struct WorkerRegistry {
    workers: std::collections::HashMap<(Network, String), std::sync::Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            workers: std::collections::HashMap::new(),
        }
    }

    pub fn register(&mut self, worker: std::sync::Arc<dyn Worker>) {
        for network in worker.networks() {
            self.workers.insert((*network, worker.name().to_string()), worker.clone());
        }
    }

    pub fn get(&self, network: Network, name: &str) -> Option<std::sync::Arc<dyn Worker>> {
        self.workers.get(&(network, name.to_string())).cloned()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_by_network_and_name() {
        let mut registry = WorkerRegistry::new();
        registry.register(std::sync::Arc::new(OptimismBridgeWorker::new()));

        assert!(registry.get(Network::Ethereum, "optimism-bridge").is_some());
        assert!(registry.get(Network::Optimism, "optimism-bridge").is_none());
        assert!(registry.get(Network::Ethereum, "nonexistent").is_none());
    }
}
