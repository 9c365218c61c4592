// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fallback worker for Arweave transactions that carry no value transfer
//! (spec.md §8 S4, S5) — typically the inner items of an ANS-104 bundle
//! authored by a known bundler, recording arbitrary application content
//! rather than an AR transfer. Mirrors the original implementation's
//! `fallback/arweave` worker, split from [`crate::ArweaveNativeTransferWorker`]
//! so the two match mutually exclusive, jointly exhaustive subsets of
//! Arweave tasks (spec.md §8 invariant 6).

use node_types::{
    Action, ActionMetadata, Activity, Fee, Filter, Network, Platform, Tag, Task, TaskPayload, Type,
};

use crate::address::derive_arweave_address;
use crate::{Worker, WorkerError};

pub struct ArweaveBundleFallbackWorker {
    /// Known bundler owner addresses the Data Source uses to decide which
    /// outer transactions to decompose (spec.md §4.2 step e). Declared
    /// here too so the Data Source's early-prune filter matches what this
    /// worker will eventually accept.
    bundler_owners: Vec<String>,
}

impl ArweaveBundleFallbackWorker {
    pub fn new() -> Self {
        Self { bundler_owners: Vec::new() }
    }

    pub fn with_bundler_owners(mut self, owners: impl IntoIterator<Item = String>) -> Self {
        self.bundler_owners = owners.into_iter().collect();
        self
    }
}

impl Default for ArweaveBundleFallbackWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Worker for ArweaveBundleFallbackWorker {
    fn name(&self) -> &'static str {
        "arweave-bundle-fallback"
    }

    fn platform(&self) -> Platform {
        Platform::Rss3
    }

    fn networks(&self) -> &[Network] {
        &[Network::ArweaveMainnet]
    }

    fn tags(&self) -> &[Tag] {
        &[Tag::Social]
    }

    fn types(&self) -> &[Type] {
        &[Type::SocialPost]
    }

    fn filter(&self) -> Filter {
        Filter::new(self.networks().to_vec()).with_owners(self.bundler_owners.clone())
    }

    fn matches(&self, task: &Task) -> bool {
        let TaskPayload::Arweave { transaction, .. } = &task.payload else {
            return false;
        };
        zero_quantity(transaction)
    }

    fn transform(&self, task: &Task) -> Result<Activity, WorkerError> {
        let TaskPayload::Arweave { transaction, .. } = &task.payload else {
            panic!("arweave-bundle-fallback received a non-Arweave task: {}", task.id);
        };

        let from = derive_arweave_address(&transaction.owner);
        let to = transaction.target.clone();

        Ok(Activity {
            id: task.id.clone(),
            network: task.network,
            from: from.clone(),
            to: to.clone(),
            ty: Type::SocialPost,
            tag: Tag::Social,
            platform: Platform::Rss3,
            timestamp: task.timestamp,
            status: true,
            fee: Fee {
                amount: "0".to_string(),
                decimal: 12,
                address: None,
            },
            actions: vec![Action {
                ty: Type::SocialPost,
                platform: Platform::Rss3,
                from,
                to,
                metadata: ActionMetadata::Post {
                    body: String::new(),
                    uri: Some(format!("ar://{}", transaction.id)),
                },
            }],
        })
    }
}

fn zero_quantity(transaction: &node_types::ArweaveTransaction) -> bool {
    transaction.quantity.parse::<u128>().map(|q| q == 0).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use node_types::{ArweaveBlockRef, ArweaveTransaction};

    fn content_task(id: &str, owner: &str) -> Task {
        Task {
            network: Network::ArweaveMainnet,
            id: id.to_string(),
            timestamp: Utc::now(),
            payload: TaskPayload::Arweave {
                block: ArweaveBlockRef { height: 10, index_in_block: 0 },
                transaction: ArweaveTransaction {
                    id: id.to_string(),
                    owner: owner.to_string(),
                    target: String::new(),
                    quantity: "0".to_string(),
                    tags: vec![],
                },
            },
        }
    }

    #[test]
    fn s4_bundle_item_matches_and_transforms() {
        let worker = ArweaveBundleFallbackWorker::new().with_bundler_owners(["bundler-owner".to_string()]);
        let task = content_task("item-1", "bundler-owner");

        assert!(worker.matches(&task));
        let activity = worker.transform(&task).unwrap();
        assert_eq!(activity.ty, Type::SocialPost);
        match &activity.actions[0].metadata {
            ActionMetadata::Post { uri, .. } => assert_eq!(uri.as_deref(), Some("ar://item-1")),
            other => panic!("expected Post metadata, got {other:?}"),
        }
    }

    #[test]
    fn positive_quantity_transaction_is_not_matched() {
        let worker = ArweaveBundleFallbackWorker::new();
        let mut task = content_task("item-2", "owner");
        if let TaskPayload::Arweave { transaction, .. } = &mut task.payload {
            transaction.quantity = "5".to_string();
        }
        assert!(!worker.matches(&task));
    }

    #[test]
    fn s5_two_items_from_deduplicated_bundle_each_transform_independently() {
        let worker = ArweaveBundleFallbackWorker::new();
        let a = content_task("item-a", "owner");
        let b = content_task("item-b", "owner");

        let activity_a = worker.transform(&a).unwrap();
        let activity_b = worker.transform(&b).unwrap();
        assert_ne!(activity_a.id, activity_b.id);
    }
}
