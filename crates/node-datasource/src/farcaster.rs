// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Farcaster Hub pump: the message-stream variant of spec.md §4.2 ("message-
//! stream variants are simpler — they cursor on message id/time").

use parking_lot::Mutex;

use chrono::Utc;
use node_metrics::SourceClientMetrics;
use node_source_clients::FarcasterHubClient;
use node_types::{Network, Task, TaskPayload};
use node_metrics::MeteredSender;
use tokio_util::sync::CancellationToken;

use crate::{call, decode_cursor, encode_cursor, DataSource, DataSourceError, TaskBatch};

pub struct FarcasterDataSource {
    client: FarcasterHubClient,
    metrics: Option<SourceClientMetrics>,
    cursor: Mutex<Option<String>>,
}

impl FarcasterDataSource {
    pub fn new(client: FarcasterHubClient, initial_state: &[u8]) -> Self {
        Self { client, metrics: None, cursor: Mutex::new(decode_cursor(initial_state)) }
    }

    pub fn with_metrics(mut self, metrics: SourceClientMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait::async_trait]
impl DataSource for FarcasterDataSource {
    fn network(&self) -> Network {
        Network::Farcaster
    }

    fn state(&self) -> Vec<u8> {
        match self.cursor.lock().as_deref() {
            Some(cursor) => encode_cursor(cursor),
            None => Vec::new(),
        }
    }

    async fn run(self: Box<Self>, tasks: MeteredSender<TaskBatch>, cancel: CancellationToken) -> Result<(), DataSourceError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let cursor = self.cursor.lock().clone();
            let (casts, next_cursor) = call(Network::Farcaster, "casts_since", self.metrics.as_ref(), &cancel, || {
                self.client.casts_since(cursor.as_deref(), &cancel)
            })
            .await?;

            if casts.is_empty() {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(Network::Farcaster.poll_interval()) => {}
                }
                continue;
            }

            let batch_tasks: Vec<Task> = casts
                .into_iter()
                .map(|cast| Task {
                    network: Network::Farcaster,
                    id: cast.hash.clone(),
                    timestamp: Utc::now(),
                    payload: TaskPayload::Farcaster { cast },
                })
                .collect();

            let state_cursor = next_cursor.clone().unwrap_or_default();
            tasks
                .send(TaskBatch { tasks: batch_tasks, state: encode_cursor(&state_cursor) })
                .await
                .map_err(|_| DataSourceError::ChannelClosed)?;

            *self.cursor.lock() = next_cursor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resumes_from_persisted_cursor() {
        let client = FarcasterHubClient::new("http://localhost", 1).unwrap();
        let source = FarcasterDataSource::new(client, &encode_cursor("page-2"));
        assert_eq!(source.state(), encode_cursor("page-2"));
    }

    #[test]
    fn empty_state_means_no_cursor_yet() {
        let client = FarcasterHubClient::new("http://localhost", 1).unwrap();
        let source = FarcasterDataSource::new(client, &[]);
        assert!(source.state().is_empty());
    }
}
