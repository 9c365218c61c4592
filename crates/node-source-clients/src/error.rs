// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use node_retry::Classify;
use thiserror::Error;

/// Shared error shape for every protocol client in this crate. The
/// terminal/transient split follows spec.md §4.1: malformed responses,
/// authentication failures, and "not found" are terminal; everything
/// network-shaped is retried.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("not found")]
    NotFound,
    #[error("authentication failed")]
    Unauthorized,
}

impl Classify for ClientError {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClientError::Decode(_) | ClientError::NotFound | ClientError::Unauthorized
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.status().map(|s| s.as_u16()) == Some(401) || err.status().map(|s| s.as_u16()) == Some(403) {
            ClientError::Unauthorized
        } else if err.status().map(|s| s.as_u16()) == Some(404) {
            ClientError::NotFound
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
