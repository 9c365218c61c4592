// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use node_source_clients::ClientError;
use thiserror::Error;

/// Always terminal (SPEC_FULL.md §4.2): transient source-client errors
/// never reach here, they are retried forever inside
/// `node_retry::with_retry` at the call site. A `DataSourceError`
/// surfacing means the instance's error channel fires and the Indexer
/// Engine shuts the instance down (spec.md §7 "Terminal errors... cause
/// ordered shutdown").
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("source client terminal error: {0}")]
    Client(#[from] ClientError),
    #[error("bundle decode configuration error: {0}")]
    Bundle(String),
    #[error("cancelled")]
    Cancelled,
    #[error("downstream channel closed")]
    ChannelClosed,
}

impl<E: Into<ClientError>> From<node_retry::RetryOutcome<E>> for DataSourceError {
    fn from(outcome: node_retry::RetryOutcome<E>) -> Self {
        match outcome {
            node_retry::RetryOutcome::Cancelled => DataSourceError::Cancelled,
            node_retry::RetryOutcome::Error(err) => DataSourceError::Client(err.into()),
        }
    }
}
