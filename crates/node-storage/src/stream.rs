// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Stream publish (spec.md §4.4 sink stage, §1 "Stream publisher backends
//! ... out of scope"): a thin `StreamSink` trait so the Indexer Engine can
//! publish each committed `Activity` at-least-once without depending on a
//! concrete backend. The real Kafka-backed sink lives outside this
//! workspace; `LogStreamSink` stands in for it in tests and for
//! deployments that don't need a stream at all.

use async_trait::async_trait;
use node_types::Activity;

#[async_trait]
pub trait StreamSink: Send + Sync {
    /// Publishes one Activity. Failures are logged by the caller and
    /// never block the commit (spec.md §4.4 "If the stream publish
    /// fails, the transaction still commits").
    async fn publish(&self, activity: &Activity) -> Result<(), StreamError>;
}

#[derive(Debug, thiserror::Error)]
#[error("stream publish failed: {0}")]
pub struct StreamError(pub String);

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStreamSink;

#[async_trait]
impl StreamSink for NoopStreamSink {
    async fn publish(&self, _activity: &Activity) -> Result<(), StreamError> {
        Ok(())
    }
}

/// Logs every Activity it would have published, at the same
/// at-least-once granularity a real Kafka producer would offer.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStreamSink;

#[async_trait]
impl StreamSink for LogStreamSink {
    async fn publish(&self, activity: &Activity) -> Result<(), StreamError> {
        tracing::info!(
            network = %activity.network,
            id = %activity.id,
            "stream publish"
        );
        Ok(())
    }
}
