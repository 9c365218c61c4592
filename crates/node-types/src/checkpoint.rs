// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Network;

/// Primary key for a [`Checkpoint`]: one per `(network, worker,
/// parameters)` instance (spec.md §3). `parameters_hash` is a stable hash
/// of the worker's construction parameters so two differently-parameterized
/// instances of the same worker on the same network get independent
/// checkpoints (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckpointId {
    pub network: Network,
    pub worker: String,
    pub parameters_hash: String,
}

impl CheckpointId {
    pub fn new(network: Network, worker: impl Into<String>, parameters: &impl Serialize) -> Self {
        let canonical = serde_json::to_vec(parameters).expect("parameters must serialize");
        let parameters_hash = blake3::hash(&canonical).to_hex().to_string();
        Self {
            network,
            worker: worker.into(),
            parameters_hash,
        }
    }
}

/// The durable resume point for one `(network, worker, parameters)`
/// instance (spec.md §3). `state` is always the high-watermark already
/// processed — never what is in-flight — and is opaque to everything but
/// the owning Data Source (spec.md §9 "Opaque State").
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub state: Vec<u8>,
    pub index_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn initial(id: CheckpointId) -> Self {
        Self {
            id,
            state: Vec::new(),
            index_count: 0,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_worker_different_parameters_hash_to_different_ids() {
        let a = CheckpointId::new(Network::Ethereum, "optimism-bridge", &serde_json::json!({"contract": "0x1"}));
        let b = CheckpointId::new(Network::Ethereum, "optimism-bridge", &serde_json::json!({"contract": "0x2"}));
        assert_ne!(a.parameters_hash, b.parameters_hash);
    }

    #[test]
    fn same_parameters_hash_identically() {
        let a = CheckpointId::new(Network::Ethereum, "optimism-bridge", &serde_json::json!({"contract": "0x1"}));
        let b = CheckpointId::new(Network::Ethereum, "optimism-bridge", &serde_json::json!({"contract": "0x1"}));
        assert_eq!(a, b);
    }
}
