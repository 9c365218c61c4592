// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! RSS feed fetcher. Thin wrapper around `reqwest` + the `rss` crate.

use std::sync::Arc;

use node_types::RssItem;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ClientError;

#[derive(Clone)]
pub struct RssFetchClient {
    http: reqwest::Client,
    semaphore: Arc<Semaphore>,
}

impl RssFetchClient {
    pub fn new(concurrent_requests: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            semaphore: Arc::new(Semaphore::new(concurrent_requests.max(1))),
        }
    }

    pub async fn fetch_feed(&self, feed_url: &Url, cancel: &CancellationToken) -> Result<Vec<RssItem>, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Transport("cancelled".to_string()));
        }
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ClientError::Transport("semaphore closed".to_string()))?;

        let response = self.http.get(feed_url.clone()).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        let bytes = response.error_for_status()?.bytes().await?;
        let channel = ::rss::Channel::read_from(&bytes[..]).map_err(|e| ClientError::Decode(e.to_string()))?;

        Ok(channel
            .items()
            .iter()
            .filter_map(|item| {
                Some(RssItem {
                    feed_url: feed_url.to_string(),
                    guid: item.guid().map(|g| g.value().to_string())?,
                    title: item.title().unwrap_or_default().to_string(),
                    link: item.link().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_feed_items() {
        let server = MockServer::start().await;
        let body = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title><link>https://e.com</link><description>d</description>
<item><title>Hello</title><link>https://e.com/1</link><guid>g1</guid></item>
</channel></rss>"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = RssFetchClient::new(4);
        let cancel = CancellationToken::new();
        let url = Url::parse(&server.uri()).unwrap();
        let items = client.fetch_feed(&url, &cancel).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "g1");
    }
}
