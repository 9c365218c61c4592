// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Native Arweave value transfer worker (spec.md §8 S3): a transaction
//! carrying a positive `quantity` is a plain AR transfer between the
//! sender (derived from the owner key) and the `target` address.

use node_types::{
    Action, ActionMetadata, Activity, Fee, Filter, Network, Platform, Tag, Task, TaskPayload,
    TokenAmount, Type,
};

use crate::address::derive_arweave_address;
use crate::{Worker, WorkerError};

pub struct ArweaveNativeTransferWorker;

impl ArweaveNativeTransferWorker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ArweaveNativeTransferWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Worker for ArweaveNativeTransferWorker {
    fn name(&self) -> &'static str {
        "arweave-native-transfer"
    }

    fn platform(&self) -> Platform {
        Platform::ArweaveNative
    }

    fn networks(&self) -> &[Network] {
        &[Network::ArweaveMainnet]
    }

    fn tags(&self) -> &[Tag] {
        &[Tag::Transaction]
    }

    fn types(&self) -> &[Type] {
        &[Type::TransactionTransfer]
    }

    fn filter(&self) -> Filter {
        Filter::new(self.networks().to_vec())
    }

    fn matches(&self, task: &Task) -> bool {
        let TaskPayload::Arweave { transaction, .. } = &task.payload else {
            return false;
        };
        quantity(transaction).map(|q| q > 0).unwrap_or(false)
    }

    fn transform(&self, task: &Task) -> Result<Activity, WorkerError> {
        let TaskPayload::Arweave { transaction, .. } = &task.payload else {
            panic!("arweave-native-transfer received a non-Arweave task: {}", task.id);
        };

        let value = quantity(transaction).ok_or_else(|| WorkerError::NoMatchingEvent {
            worker: self.name(),
            task_id: task.id.clone(),
        })?;

        let from = derive_arweave_address(&transaction.owner);
        let to = transaction.target.clone();

        Ok(Activity {
            id: task.id.clone(),
            network: task.network,
            from: from.clone(),
            to: to.clone(),
            ty: Type::TransactionTransfer,
            tag: Tag::Transaction,
            platform: Platform::ArweaveNative,
            timestamp: task.timestamp,
            status: true,
            fee: Fee {
                amount: "0".to_string(),
                decimal: 12,
                address: None,
            },
            actions: vec![Action {
                ty: Type::TransactionTransfer,
                platform: Platform::ArweaveNative,
                from,
                to,
                metadata: ActionMetadata::Transfer {
                    token: TokenAmount {
                        name: "Arweave".to_string(),
                        symbol: "AR".to_string(),
                        decimals: 12,
                        value: value.to_string(),
                        address: None,
                        standard: None,
                    },
                },
            }],
        })
    }
}

fn quantity(transaction: &node_types::ArweaveTransaction) -> Option<u128> {
    transaction.quantity.parse::<u128>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use node_types::{ArweaveBlockRef, ArweaveTransaction};

    fn arweave_task(quantity: &str, owner: &str, target: &str) -> Task {
        Task {
            network: Network::ArweaveMainnet,
            id: "tx-1".to_string(),
            timestamp: Utc::now(),
            payload: TaskPayload::Arweave {
                block: ArweaveBlockRef {
                    height: 1,
                    index_in_block: 0,
                },
                transaction: ArweaveTransaction {
                    id: "tx-1".to_string(),
                    owner: owner.to_string(),
                    target: target.to_string(),
                    quantity: quantity.to_string(),
                    tags: vec![],
                },
            },
        }
    }

    #[test]
    fn s3_positive_quantity_transfer_matches_and_transforms() {
        let worker = ArweaveNativeTransferWorker::new();
        let task = arweave_task("1000000000000", "owner-key", "target-address");

        assert!(worker.matches(&task));
        let activity = worker.transform(&task).unwrap();

        assert_eq!(activity.ty, Type::TransactionTransfer);
        assert_eq!(activity.to, "target-address");
        match &activity.actions[0].metadata {
            ActionMetadata::Transfer { token } => {
                assert_eq!(token.value, "1000000000000");
                assert_eq!(token.symbol, "AR");
            }
            other => panic!("expected Transfer metadata, got {other:?}"),
        }
    }

    #[test]
    fn zero_quantity_does_not_match() {
        let worker = ArweaveNativeTransferWorker::new();
        let task = arweave_task("0", "owner-key", "target-address");
        assert!(!worker.matches(&task));
    }
}
