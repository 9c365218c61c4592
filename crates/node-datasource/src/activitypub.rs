// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! ActivityPub outbox pump: the message-stream variant for federated actor
//! outboxes (spec.md §4.2 "message-stream variants are simpler").

use parking_lot::Mutex;

use chrono::Utc;
use node_metrics::SourceClientMetrics;
use node_source_clients::ActivityPubClient;
use node_types::{Network, Task, TaskPayload};
use node_metrics::MeteredSender;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{call, DataSource, DataSourceError, TaskBatch};

pub struct ActivityPubDataSource {
    client: ActivityPubClient,
    outbox_url: Url,
    metrics: Option<SourceClientMetrics>,
    cursor: Mutex<Option<Url>>,
}

impl ActivityPubDataSource {
    pub fn new(client: ActivityPubClient, outbox_url: Url, initial_state: &[u8]) -> Self {
        let cursor = crate::decode_cursor(initial_state).and_then(|s| Url::parse(&s).ok());
        Self { client, outbox_url, metrics: None, cursor: Mutex::new(cursor) }
    }

    pub fn with_metrics(mut self, metrics: SourceClientMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait::async_trait]
impl DataSource for ActivityPubDataSource {
    fn network(&self) -> Network {
        Network::ActivityPub
    }

    fn state(&self) -> Vec<u8> {
        match self.cursor.lock().as_ref() {
            Some(url) => crate::encode_cursor(url.as_str()),
            None => Vec::new(),
        }
    }

    async fn run(self: Box<Self>, tasks: MeteredSender<TaskBatch>, cancel: CancellationToken) -> Result<(), DataSourceError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let cursor = self.cursor.lock().clone();
            let (messages, next_cursor) =
                call(Network::ActivityPub, "outbox_since", self.metrics.as_ref(), &cancel, || {
                    self.client.outbox_since(&self.outbox_url, cursor.as_ref(), &cancel)
                })
                .await?;

            if messages.is_empty() {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(Network::ActivityPub.poll_interval()) => {}
                }
                continue;
            }

            let batch_tasks: Vec<Task> = messages
                .into_iter()
                .map(|message| Task {
                    network: Network::ActivityPub,
                    id: message.object_id.clone(),
                    timestamp: Utc::now(),
                    payload: TaskPayload::ActivityPub { message },
                })
                .collect();

            let state = next_cursor.as_ref().map(|u| u.as_str().to_string()).unwrap_or_default();
            tasks
                .send(TaskBatch { tasks: batch_tasks, state: crate::encode_cursor(&state) })
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
    fn resumes_from_persisted_page_url() {
        let client = ActivityPubClient::new(1);
        let outbox = Url::parse("https://example.social/users/alice/outbox").unwrap();
        let page = "https://example.social/users/alice/outbox?page=2";
        let source = ActivityPubDataSource::new(client, outbox, &crate::encode_cursor(page));
        assert_eq!(source.state(), crate::encode_cursor(page));
    }
}
