// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Progress/status publish (spec.md §4.4, §6 "Progress key layout"): a
//! Redis-backed `ProgressStore`, grounded on the original's
//! `provider/redis/handle_updates.go` key layout and the `redis` crate
//! already in the teacher's `workspace.dependencies`. Best-effort: a
//! failed publish is logged and ignored, never blocks the pipeline
//! (spec.md §5 "the Redis-like cache ... is best-effort").

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

/// Mirrors the Indexer Engine's `worker_status` gauge encoding (spec.md
/// §4.4): `unhealthy` after `N` consecutive pump restarts without
/// progress, `ready` once within `K` source blocks of head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Preparing,
    Ready,
    Indexing,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub remote_state: u64,
    pub indexed_state: u64,
    pub index_count: i64,
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn set_status(&self, worker_id: &str, status: WorkerStatus);
    async fn set_progress(&self, worker_id: &str, progress: &ProgressRecord);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressStore;

#[async_trait]
impl ProgressStore for NoopProgressStore {
    async fn set_status(&self, _worker_id: &str, _status: WorkerStatus) {}
    async fn set_progress(&self, _worker_id: &str, _progress: &ProgressRecord) {}
}

#[derive(Clone)]
pub struct RedisProgressStore {
    client: redis::Client,
}

impl RedisProgressStore {
    pub fn new(url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }

    fn status_key(worker_id: &str) -> String {
        format!("worker:status:id:{worker_id}")
    }

    fn progress_key(worker_id: &str) -> String {
        format!("worker:progress:{worker_id}")
    }
}

#[async_trait]
impl ProgressStore for RedisProgressStore {
    async fn set_status(&self, worker_id: &str, status: WorkerStatus) {
        let Ok(value) = serde_json::to_string(&status) else {
            return;
        };
        let result: redis::RedisResult<()> = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            conn.set(Self::status_key(worker_id), value).await
        }
        .await;
        if let Err(err) = result {
            tracing::warn!(worker_id, error = %err, "failed to publish worker status, ignoring");
        }
    }

    async fn set_progress(&self, worker_id: &str, progress: &ProgressRecord) {
        let Ok(value) = serde_json::to_string(progress) else {
            return;
        };
        let result: redis::RedisResult<()> = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            conn.set(Self::progress_key(worker_id), value).await
        }
        .await;
        if let Err(err) = result {
            tracing::warn!(worker_id, error = %err, "failed to publish worker progress, ignoring");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_matches_spec() {
        assert_eq!(
            RedisProgressStore::status_key("ethereum:optimism-bridge:abc"),
            "worker:status:id:ethereum:optimism-bridge:abc"
        );
        assert_eq!(
            RedisProgressStore::progress_key("ethereum:optimism-bridge:abc"),
            "worker:progress:ethereum:optimism-bridge:abc"
        );
    }
}
