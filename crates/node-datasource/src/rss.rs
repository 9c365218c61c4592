// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! RSS feed pump: the message-stream variant for feeds with no server-side
//! cursor (spec.md §4.2 "message-stream variants are simpler"). Each poll
//! re-fetches the whole feed; State is the last-seen item guid so restarts
//! don't re-emit what has already been indexed.

use parking_lot::Mutex;

use chrono::Utc;
use node_metrics::SourceClientMetrics;
use node_source_clients::RssFetchClient;
use node_types::{Network, Task, TaskPayload};
use node_metrics::MeteredSender;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{call, decode_cursor, encode_cursor, DataSource, DataSourceError, TaskBatch};

pub struct RssDataSource {
    client: RssFetchClient,
    feed_url: Url,
    metrics: Option<SourceClientMetrics>,
    last_guid: Mutex<Option<String>>,
}

impl RssDataSource {
    pub fn new(client: RssFetchClient, feed_url: Url, initial_state: &[u8]) -> Self {
        Self { client, feed_url, metrics: None, last_guid: Mutex::new(decode_cursor(initial_state)) }
    }

    pub fn with_metrics(mut self, metrics: SourceClientMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait::async_trait]
impl DataSource for RssDataSource {
    fn network(&self) -> Network {
        Network::Rss
    }

    fn state(&self) -> Vec<u8> {
        match self.last_guid.lock().as_deref() {
            Some(guid) => encode_cursor(guid),
            None => Vec::new(),
        }
    }

    async fn run(self: Box<Self>, tasks: MeteredSender<TaskBatch>, cancel: CancellationToken) -> Result<(), DataSourceError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let items = call(Network::Rss, "fetch_feed", self.metrics.as_ref(), &cancel, || {
                self.client.fetch_feed(&self.feed_url, &cancel)
            })
            .await?;

            // The feed has no native cursor: items arrive newest-first
            // (the `rss` crate preserves document order), so everything
            // up to the last-seen guid is a repeat of a prior poll.
            let last_guid = self.last_guid.lock().clone();
            let fresh: Vec<_> = match &last_guid {
                Some(seen) => items.into_iter().take_while(|item| &item.guid != seen).collect(),
                None => items,
            };

            if fresh.is_empty() {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(Network::Rss.poll_interval()) => {}
                }
                continue;
            }

            let new_last_guid = fresh[0].guid.clone();
            // Source order is newest-first; Task order must mirror it
            // ascending (oldest-first) like every other variant.
            let batch_tasks: Vec<Task> = fresh
                .into_iter()
                .rev()
                .map(|item| Task {
                    network: Network::Rss,
                    id: item.guid.clone(),
                    timestamp: Utc::now(),
                    payload: TaskPayload::Rss { item },
                })
                .collect();

            tasks
                .send(TaskBatch { tasks: batch_tasks, state: encode_cursor(&new_last_guid) })
                .await
                .map_err(|_| DataSourceError::ChannelClosed)?;

            *self.last_guid.lock() = Some(new_last_guid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resumes_from_persisted_last_guid() {
        let client = RssFetchClient::new(1);
        let feed = Url::parse("https://example.com/feed.xml").unwrap();
        let source = RssDataSource::new(client, feed, &encode_cursor("guid-7"));
        assert_eq!(source.state(), encode_cursor("guid-7"));
    }
}
