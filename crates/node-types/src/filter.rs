// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{Network, Task};

/// A worker's declaration of which source events it cares about, so the
/// Data Source can prune before handing tasks to the worker (spec.md §3,
/// §4.2 step d, §4.3 `filter()`).
///
/// `Filter` is static for the lifetime of a worker instance: it is
/// computed once at construction and never mutated (spec.md §3
/// invariant).
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Networks the worker is interested in.
    pub networks: Vec<Network>,
    /// Contract / account addresses, lower-cased hex for EVM networks.
    pub addresses: Vec<String>,
    /// Log topic0 hashes (EVM) the worker matches against.
    pub topics: Vec<String>,
    /// Owner addresses (Arweave bundlers, ActivityPub actors, …).
    pub owners: Vec<String>,
}

impl Filter {
    pub fn new(networks: Vec<Network>) -> Self {
        Self {
            networks,
            ..Default::default()
        }
    }

    pub fn with_addresses(mut self, addresses: impl IntoIterator<Item = String>) -> Self {
        self.addresses = addresses.into_iter().collect();
        self
    }

    pub fn with_topics(mut self, topics: impl IntoIterator<Item = String>) -> Self {
        self.topics = topics.into_iter().collect();
        self
    }

    pub fn with_owners(mut self, owners: impl IntoIterator<Item = String>) -> Self {
        self.owners = owners.into_iter().collect();
        self
    }

    /// Used to check invariant 6 (spec.md §8): `worker.match(t)` must imply
    /// `filter.admits(t)`. The Data Source uses the cheaper, early checks
    /// (`admits_address`/`admits_owner`) directly; this full check is for
    /// tests and defensive assertions.
    pub fn admits(&self, task: &Task) -> bool {
        if !self.networks.is_empty() && !self.networks.contains(&task.network) {
            return false;
        }
        match &task.payload {
            crate::TaskPayload::Evm { tx, receipt, .. } => {
                let to_matches = tx
                    .to
                    .as_deref()
                    .map(|to| self.admits_address(to))
                    .unwrap_or(self.addresses.is_empty());
                let topic_matches = self.topics.is_empty()
                    || receipt
                        .logs
                        .iter()
                        .any(|log| log.topics.first().map(|t| self.admits_topic(t)).unwrap_or(false));
                to_matches || topic_matches
            }
            crate::TaskPayload::Arweave { transaction, .. } => {
                self.owners.is_empty() || self.admits_owner(&transaction.owner)
            }
            crate::TaskPayload::Farcaster { .. }
            | crate::TaskPayload::ActivityPub { .. }
            | crate::TaskPayload::Rss { .. } => true,
        }
    }

    pub fn admits_address(&self, address: &str) -> bool {
        self.addresses.is_empty()
            || self
                .addresses
                .iter()
                .any(|a| a.eq_ignore_ascii_case(address))
    }

    pub fn admits_topic(&self, topic: &str) -> bool {
        self.topics.is_empty() || self.topics.iter().any(|t| t.eq_ignore_ascii_case(topic))
    }

    pub fn admits_owner(&self, owner: &str) -> bool {
        self.owners.is_empty() || self.owners.iter().any(|o| o.eq_ignore_ascii_case(owner))
    }
}
