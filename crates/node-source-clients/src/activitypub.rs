// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! ActivityPub client: paginates an actor outbox collection.

use std::sync::Arc;

use node_types::ActivityPubMessage;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ClientError;

#[derive(Clone)]
pub struct ActivityPubClient {
    http: reqwest::Client,
    semaphore: Arc<Semaphore>,
}

impl ActivityPubClient {
    pub fn new(concurrent_requests: usize) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent("node/0.1")
                .build()
                .expect("static client config is valid"),
            semaphore: Arc::new(Semaphore::new(concurrent_requests.max(1))),
        }
    }

    /// Fetches one outbox page. `cursor` is the next-page URL returned by
    /// the previous call, or `None` for the first page.
    pub async fn outbox_since(
        &self,
        outbox_url: &Url,
        cursor: Option<&Url>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<ActivityPubMessage>, Option<Url>), ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Transport("cancelled".to_string()));
        }
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ClientError::Transport("semaphore closed".to_string()))?;

        let url = cursor.cloned().unwrap_or_else(|| outbox_url.clone());
        let response = self
            .http
            .get(url)
            .header("Accept", "application/activity+json")
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        let page: OrderedCollectionPage = response.error_for_status()?.json().await?;

        let messages = page
            .ordered_items
            .into_iter()
            .map(|item| ActivityPubMessage {
                actor: item.actor,
                object_id: item.object,
                activity_type: item.ty,
            })
            .collect();

        let next = page.next.and_then(|s| Url::parse(&s).ok());
        Ok((messages, next))
    }
}

#[derive(Debug, Deserialize)]
struct OrderedCollectionPage {
    #[serde(rename = "orderedItems", default)]
    ordered_items: Vec<RawActivity>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawActivity {
    actor: String,
    object: String,
    #[serde(rename = "type")]
    ty: String,
}
