// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The persistence boundary (spec.md §4.5): idempotent `Activity` upserts,
//! atomic `Checkpoint` advances, and the ancillary progress/stream sinks
//! the Indexer Engine talks to. `PgStore` is the production backend
//! (`diesel-async` + `bb8` + Postgres); `MemoryStore` is an in-memory test
//! double with identical transactional semantics, grounded on the
//! teacher's `test_authority_builder`-style in-memory fakes.

mod memory;
mod models;
mod pg;
mod progress;
pub mod query;
mod schema;
mod stream;

use async_trait::async_trait;
use node_types::{Activity, Checkpoint, CheckpointId, Network};
use thiserror::Error;

pub use memory::MemoryStore;
pub use pg::{PgStore, PgStoreConfig};
pub use progress::{NoopProgressStore, ProgressRecord, ProgressStore, RedisProgressStore, WorkerStatus};
pub use query::{ActivityQuery, Cursor, Direction};
pub use stream::{LogStreamSink, NoopStreamSink, StreamSink};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database connection error: {0}")]
    Connection(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("malformed stored row: {0}")]
    Decode(String),
    #[error("no transaction is open on this handle")]
    NoTransaction,
}

/// Checkpoint Store + Activity Store (spec.md §4.5). A single trait so the
/// Indexer Engine's sink stage is generic over the backend; `begin` opens
/// the one transaction every pipeline commit runs inside (spec.md §4.4
/// "Atomicity").
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, StorageError>;

    async fn find_activity(
        &self,
        network: Network,
        id: &str,
    ) -> Result<Option<Activity>, StorageError>;

    async fn find_activities(&self, query: &ActivityQuery) -> Result<Vec<Activity>, StorageError>;

    async fn load_checkpoint(&self, id: &CheckpointId) -> Result<Option<Checkpoint>, StorageError>;

    async fn load_checkpoints(&self, network: Network) -> Result<Vec<Checkpoint>, StorageError>;
}

/// The transactional scope a pipeline commit runs inside: `save_activities`
/// and `save_checkpoint` for one batch must both succeed, or neither
/// takes effect (spec.md §4.4 "Atomicity").
#[async_trait]
pub trait StoreTransaction: Send {
    /// Idempotent batch upsert: delete-by-id then insert, per spec.md §9
    /// "Idempotent upsert" (handles the Action-list replace cleanly).
    async fn save_activities(&mut self, activities: &[Activity]) -> Result<(), StorageError>;

    /// Upsert on primary key (spec.md §4.5).
    async fn save_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), StorageError>;

    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}
