// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Farcaster Hub client. Uses `jsonrpsee`'s HTTP client rather than bare
//! `reqwest`, per SPEC_FULL.md §4.1: the teacher already depends on
//! `jsonrpsee` for its own JSON-RPC surface, so this is the one protocol
//! client that reuses it instead of hand-rolling request bodies.

use std::sync::Arc;

use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use node_types::FarcasterCast;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

#[derive(Clone)]
pub struct FarcasterHubClient {
    rpc: Arc<HttpClient>,
    semaphore: Arc<Semaphore>,
}

impl FarcasterHubClient {
    pub fn new(endpoint: &str, concurrent_requests: usize) -> Result<Self, ClientError> {
        let rpc = HttpClientBuilder::default()
            .build(endpoint)
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            rpc: Arc::new(rpc),
            semaphore: Arc::new(Semaphore::new(concurrent_requests.max(1))),
        })
    }

    /// Casts authored since `cursor` (an opaque hub-assigned page token),
    /// mirroring the Data Source's message-id cursor variant (spec.md
    /// §4.2 "message-stream variants are simpler").
    pub async fn casts_since(
        &self,
        cursor: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<FarcasterCast>, Option<String>), ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Transport("cancelled".to_string()));
        }
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ClientError::Transport("semaphore closed".to_string()))?;

        let response: CastsPage = self
            .rpc
            .request("hub.castsByFid", rpc_params![cursor])
            .await
            .map_err(|e| ClientError::Rpc {
                code: 0,
                message: e.to_string(),
            })?;

        let casts = response
            .messages
            .into_iter()
            .map(|m| FarcasterCast {
                hash: m.hash,
                author_fid: m.author_fid,
                text: m.text,
            })
            .collect();
        Ok((casts, response.next_page_token))
    }
}

#[derive(Debug, Deserialize)]
struct CastsPage {
    messages: Vec<RawCast>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCast {
    hash: String,
    author_fid: u64,
    text: String,
}
