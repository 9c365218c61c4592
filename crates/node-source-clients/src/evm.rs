// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! EVM JSON-RPC client (Ethereum/Optimism/Polygon/Arbitrum). Plain
//! `reqwest` POSTs rather than `jsonrpsee`, matching SPEC_FULL.md §4.1:
//! HTTP-transport clients use `reqwest` with a bounded semaphore; only the
//! Farcaster Hub client reaches for `jsonrpsee`.

use std::sync::Arc;

use node_types::{EvmLog, EvmReceipt, EvmTransaction};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ClientError;

/// Block body summary: just enough to enumerate the block's transaction
/// hashes. Full transaction bodies are fetched individually via [`EvmRpcClient::tx`]
/// (spec.md §4.1's `tx(hash)` primitive).
#[derive(Debug, Clone)]
pub struct EvmBlockSummary {
    pub height: u64,
    pub tx_hashes: Vec<String>,
}

#[derive(Clone)]
pub struct EvmRpcClient {
    http: reqwest::Client,
    endpoint: Url,
    semaphore: Arc<Semaphore>,
}

impl EvmRpcClient {
    pub fn new(endpoint: Url, concurrent_requests: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            semaphore: Arc::new(Semaphore::new(concurrent_requests.max(1))),
        }
    }

    async fn call(&self, method: &str, params: Value, cancel: &CancellationToken) -> Result<Value, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Transport("cancelled".to_string()));
        }
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ClientError::Transport("semaphore closed".to_string()))?;

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self.http.post(self.endpoint.clone()).json(&body).send().await?;
        let response: JsonRpcResponse = response.json().await?;

        match response.error {
            Some(err) => Err(ClientError::Rpc {
                code: err.code,
                message: err.message,
            }),
            None => response.result.ok_or(ClientError::NotFound),
        }
    }

    pub async fn head_height(&self, cancel: &CancellationToken) -> Result<u64, ClientError> {
        let result = self.call("eth_blockNumber", json!([]), cancel).await?;
        let hex: String = serde_json::from_value(result)?;
        parse_hex_u64(&hex)
    }

    pub async fn block(&self, height: u64, cancel: &CancellationToken) -> Result<EvmBlockSummary, ClientError> {
        let result = self
            .call("eth_getBlockByNumber", json!([format!("0x{height:x}"), false]), cancel)
            .await?;
        let raw: RawBlock = serde_json::from_value(result)?;
        Ok(EvmBlockSummary {
            height,
            tx_hashes: raw.transactions,
        })
    }

    pub async fn tx(&self, hash: &str, cancel: &CancellationToken) -> Result<EvmTransaction, ClientError> {
        let result = self.call("eth_getTransactionByHash", json!([hash]), cancel).await?;
        let raw: RawTransaction = serde_json::from_value(result)?;
        Ok(EvmTransaction {
            hash: raw.hash,
            from: raw.from,
            to: raw.to,
            value: raw.value,
            input: raw.input,
            gas_price: raw.gas_price.unwrap_or_default(),
            gas_used: 0,
        })
    }

    /// Fetches receipts for every transaction in a block in one call where
    /// the provider supports `eth_getBlockReceipts`; each result is keyed
    /// by transaction hash so callers can zip it with the block's
    /// transaction list.
    pub async fn receipts(
        &self,
        height: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<(String, EvmReceipt, u64)>, ClientError> {
        let result = self
            .call("eth_getBlockReceipts", json!([format!("0x{height:x}")]), cancel)
            .await?;
        let raw: Vec<RawReceipt> = serde_json::from_value(result)?;
        raw.into_iter()
            .map(|r| {
                let gas_used = parse_hex_u64(&r.gas_used)?;
                Ok((
                    r.transaction_hash,
                    EvmReceipt {
                        status: r.status.as_deref() == Some("0x1"),
                        logs: r
                            .logs
                            .into_iter()
                            .map(|l| EvmLog {
                                address: l.address,
                                topics: l.topics,
                                data: l.data,
                            })
                            .collect(),
                    },
                    gas_used,
                ))
            })
            .collect()
    }
}

fn parse_hex_u64(hex: &str) -> Result<u64, ClientError> {
    let trimmed = hex.trim_start_matches("0x");
    u64::from_str_radix(trimmed, 16).map_err(|e| ClientError::Decode(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    transactions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    hash: String,
    from: String,
    to: Option<String>,
    value: String,
    input: String,
    #[serde(rename = "gasPrice")]
    gas_price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReceipt {
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    status: Option<String>,
    #[serde(rename = "gasUsed")]
    gas_used: String,
    logs: Vec<RawLog>,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: String,
    topics: Vec<String>,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn head_height_parses_hex_quantity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "0x10",
            })))
            .mount(&server)
            .await;

        let client = EvmRpcClient::new(Url::parse(&server.uri()).unwrap(), 4);
        let cancel = CancellationToken::new();
        let height = client.head_height(&cancel).await.unwrap();
        assert_eq!(height, 16);
    }

    #[tokio::test]
    async fn rpc_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "boom" },
            })))
            .mount(&server)
            .await;

        let client = EvmRpcClient::new(Url::parse(&server.uri()).unwrap(), 4);
        let cancel = CancellationToken::new();
        let err = client.head_height(&cancel).await.unwrap_err();
        assert!(matches!(err, ClientError::Rpc { code: -32000, .. }));
    }
}
