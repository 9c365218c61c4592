// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! An in-memory `Store`, grounded on the teacher's in-memory test-double
//! style (`test_authority_builder`): identical transactional semantics to
//! `PgStore` (a staged write-set applied atomically on `commit`,
//! discarded on `rollback` or drop), without a real database — used by
//! `node-engine`'s S6 pump-restart test and anywhere else a test wants a
//! `Store` without standing up Postgres.

use async_trait::async_trait;
use node_types::{Activity, Checkpoint, CheckpointId, Network};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::query::{ActivityQuery, Direction};
use crate::{Store, StorageError, StoreTransaction};

type ActivityKey = (Network, String);
type CheckpointKey = (Network, String, String);

#[derive(Default)]
struct Tables {
    activities: BTreeMap<ActivityKey, Activity>,
    checkpoints: BTreeMap<CheckpointKey, Checkpoint>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, StorageError> {
        Ok(Box::new(MemoryTransaction {
            tables: self.tables.clone(),
            staged_activities: Vec::new(),
            staged_checkpoint: None,
        }))
    }

    async fn find_activity(
        &self,
        network: Network,
        id: &str,
    ) -> Result<Option<Activity>, StorageError> {
        Ok(self
            .tables
            .lock()
            .activities
            .get(&(network, id.to_string()))
            .cloned())
    }

    async fn find_activities(&self, query: &ActivityQuery) -> Result<Vec<Activity>, StorageError> {
        let tables = self.tables.lock();
        let mut matches: Vec<Activity> = tables
            .activities
            .values()
            .filter(|a| query.network.map_or(true, |n| n == a.network))
            .filter(|a| query.tag.map_or(true, |t| t == a.tag))
            .filter(|a| query.ty.map_or(true, |t| t == a.ty))
            .filter(|a| query.platform.map_or(true, |p| p == a.platform))
            .filter(|a| {
                query
                    .owner
                    .as_deref()
                    .map_or(true, |o| a.from == o || a.to == o)
            })
            .filter(|a| query.since.map_or(true, |s| a.timestamp >= s))
            .filter(|a| query.until.map_or(true, |u| a.timestamp <= u))
            .filter(|a| match query.cursor {
                None => true,
                Some(c) if c.direction == Direction::Forward => a.timestamp > c.timestamp,
                Some(c) => a.timestamp < c.timestamp,
            })
            .cloned()
            .collect();

        let descending = !matches!(
            query.cursor.map(|c| c.direction),
            Some(Direction::Forward)
        );
        if descending {
            matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        } else {
            matches.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        }
        matches.truncate(query.limit.max(1) as usize);
        Ok(matches)
    }

    async fn load_checkpoint(&self, id: &CheckpointId) -> Result<Option<Checkpoint>, StorageError> {
        Ok(self
            .tables
            .lock()
            .checkpoints
            .get(&(id.network, id.worker.clone(), id.parameters_hash.clone()))
            .cloned())
    }

    async fn load_checkpoints(&self, network: Network) -> Result<Vec<Checkpoint>, StorageError> {
        Ok(self
            .tables
            .lock()
            .checkpoints
            .values()
            .filter(|c| c.id.network == network)
            .cloned()
            .collect())
    }
}

struct MemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    staged_activities: Vec<Activity>,
    staged_checkpoint: Option<Checkpoint>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn save_activities(&mut self, activities: &[Activity]) -> Result<(), StorageError> {
        self.staged_activities.extend_from_slice(activities);
        Ok(())
    }

    async fn save_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        self.staged_checkpoint = Some(checkpoint.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let mut tables = self.tables.lock();
        for activity in self.staged_activities {
            tables
                .activities
                .insert((activity.network, activity.id.clone()), activity);
        }
        if let Some(checkpoint) = self.staged_checkpoint {
            let key = (
                checkpoint.id.network,
                checkpoint.id.worker.clone(),
                checkpoint.id.parameters_hash.clone(),
            );
            tables.checkpoints.insert(key, checkpoint);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        // Staged writes are simply dropped; nothing was visible to
        // readers before `commit`.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use node_types::{Action, ActionMetadata, Fee, Platform, Tag, TokenAmount, Type};

    fn sample_activity(id: &str) -> Activity {
        Activity {
            id: id.to_string(),
            network: Network::ArweaveMainnet,
            from: "alice".to_string(),
            to: "bob".to_string(),
            ty: Type::TransactionTransfer,
            tag: Tag::Transaction,
            platform: Platform::ArweaveNative,
            timestamp: Utc::now(),
            status: true,
            fee: Fee {
                amount: "0".to_string(),
                decimal: 12,
                address: None,
            },
            actions: vec![Action {
                ty: Type::TransactionTransfer,
                platform: Platform::ArweaveNative,
                from: "alice".to_string(),
                to: "bob".to_string(),
                metadata: ActionMetadata::Transfer {
                    token: TokenAmount {
                        name: "Arweave".to_string(),
                        symbol: "AR".to_string(),
                        decimals: 12,
                        value: "1".to_string(),
                        address: None,
                        standard: None,
                    },
                },
            }],
        }
    }

    #[tokio::test]
    async fn save_is_invisible_until_commit() {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.unwrap();
        txn.save_activities(&[sample_activity("a")]).await.unwrap();

        assert!(store
            .find_activity(Network::ArweaveMainnet, "a")
            .await
            .unwrap()
            .is_none());

        txn.commit().await.unwrap();
        assert!(store
            .find_activity(Network::ArweaveMainnet, "a")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.unwrap();
        txn.save_activities(&[sample_activity("a")]).await.unwrap();
        txn.rollback().await.unwrap();

        assert!(store
            .find_activity(Network::ArweaveMainnet, "a")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn resaving_same_id_replaces_actions_idempotently() {
        let store = MemoryStore::new();
        let activity = sample_activity("a");

        let mut txn = store.begin().await.unwrap();
        txn.save_activities(&[activity.clone()]).await.unwrap();
        txn.commit().await.unwrap();

        let mut txn = store.begin().await.unwrap();
        txn.save_activities(&[activity.clone()]).await.unwrap();
        txn.commit().await.unwrap();

        let found = store
            .find_activity(Network::ArweaveMainnet, "a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.actions.len(), 1);
    }
}
