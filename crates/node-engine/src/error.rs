// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use node_datasource::DataSourceError;
use node_storage::StorageError;
use thiserror::Error;

/// One pump-loop iteration's outcome: every variant here causes the
/// Indexer Engine's outer loop to restart the instance from the last
/// persisted Checkpoint (spec.md §4.4, §7 Propagation).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("data source terminated: {0}")]
    DataSource(#[from] DataSourceError),
    #[error("storage error: {0}")]
    Store(#[from] StorageError),
    #[error("transform task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}
