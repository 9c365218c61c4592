// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Arweave gateway client: block/tx lookups plus the raw `data_stream`
//! primitive the bundle decoder (`node-arweave-bundle`) consumes.

use std::sync::Arc;

use base64::Engine;
use node_types::ArweaveTransaction;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct ArweaveBlockSummary {
    pub height: u64,
    pub tx_ids: Vec<String>,
}

#[derive(Clone)]
pub struct ArweaveGatewayClient {
    http: reqwest::Client,
    endpoint: Url,
    semaphore: Arc<Semaphore>,
}

impl ArweaveGatewayClient {
    pub fn new(endpoint: Url, concurrent_requests: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            semaphore: Arc::new(Semaphore::new(concurrent_requests.max(1))),
        }
    }

    async fn get(&self, path: &str, cancel: &CancellationToken) -> Result<reqwest::Response, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Transport("cancelled".to_string()));
        }
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ClientError::Transport("semaphore closed".to_string()))?;

        let url = self
            .endpoint
            .join(path)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        let response = self.http.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        Ok(response.error_for_status()?)
    }

    pub async fn head(&self, cancel: &CancellationToken) -> Result<u64, ClientError> {
        let text = self.get("height", cancel).await?.text().await?;
        text.trim().parse().map_err(|_| ClientError::Decode(format!("bad height {text}")))
    }

    pub async fn block(&self, height: u64, cancel: &CancellationToken) -> Result<ArweaveBlockSummary, ClientError> {
        let raw: RawBlock = self
            .get(&format!("block/height/{height}"), cancel)
            .await?
            .json()
            .await?;
        Ok(ArweaveBlockSummary {
            height,
            tx_ids: raw.txs,
        })
    }

    pub async fn tx(&self, id: &str, cancel: &CancellationToken) -> Result<ArweaveTransaction, ClientError> {
        let raw: RawTransaction = self.get(&format!("tx/{id}"), cancel).await?.json().await?;
        let tags = raw
            .tags
            .into_iter()
            .map(|tag| (decode_b64url(&tag.name), decode_b64url(&tag.value)))
            .collect();
        Ok(ArweaveTransaction {
            id: raw.id,
            owner: raw.owner,
            target: raw.target,
            quantity: raw.quantity,
            tags,
        })
    }

    /// Raw transaction body, used both for ordinary transfers with a data
    /// payload and as the undecoded ANS-104 bundle container.
    pub async fn data_stream(&self, id: &str, cancel: &CancellationToken) -> Result<Vec<u8>, ClientError> {
        Ok(self.get(id, cancel).await?.bytes().await?.to_vec())
    }
}

fn decode_b64url(s: &str) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(s)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| s.to_string())
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    txs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    id: String,
    owner: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    quantity: String,
    #[serde(default)]
    tags: Vec<RawTag>,
}

#[derive(Debug, Deserialize)]
struct RawTag {
    name: String,
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn head_parses_plain_text_height() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/height"))
            .respond_with(ResponseTemplate::new(200).set_body_string("123456"))
            .mount(&server)
            .await;

        let client = ArweaveGatewayClient::new(Url::parse(&server.uri()).unwrap(), 4);
        let cancel = CancellationToken::new();
        assert_eq!(client.head(&cancel).await.unwrap(), 123456);
    }

    #[tokio::test]
    async fn tx_decodes_base64url_tags() {
        let server = MockServer::start().await;
        let name = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("App-Name");
        let value = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("arweave.app");
        Mock::given(method("GET"))
            .and(path("/tx/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc",
                "owner": "owner-key",
                "target": "",
                "quantity": "0",
                "tags": [{"name": name, "value": value}],
            })))
            .mount(&server)
            .await;

        let client = ArweaveGatewayClient::new(Url::parse(&server.uri()).unwrap(), 4);
        let cancel = CancellationToken::new();
        let tx = client.tx("abc", &cancel).await.unwrap();
        assert_eq!(tx.tags[0], ("App-Name".to_string(), "arweave.app".to_string()));
    }

    #[tokio::test]
    async fn not_found_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tx/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ArweaveGatewayClient::new(Url::parse(&server.uri()).unwrap(), 4);
        let cancel = CancellationToken::new();
        let err = client.tx("missing", &cancel).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound));
        assert!(node_retry::Classify::is_terminal(&err));
    }
}
