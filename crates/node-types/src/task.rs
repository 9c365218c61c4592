// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Network;

/// One unit of raw-source input handed to a [`crate::Worker`] (spec.md §3).
///
/// `payload` is a closed, tagged sum — one variant per source protocol —
/// dispatched via pattern matching rather than dynamic upcasting, per
/// spec.md §9 "Variant payloads."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub network: Network,
    /// Source-unique id: tx hash, message id, cast hash, etc. `(network,
    /// id)` is globally unique within a checkpoint horizon (spec.md §3).
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: TaskPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskPayload {
    Evm {
        block: EvmBlockRef,
        tx: EvmTransaction,
        receipt: EvmReceipt,
    },
    Arweave {
        block: ArweaveBlockRef,
        transaction: ArweaveTransaction,
    },
    Farcaster {
        cast: FarcasterCast,
    },
    ActivityPub {
        message: ActivityPubMessage,
    },
    Rss {
        item: RssItem,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvmBlockRef {
    pub height: u64,
    pub index_in_block: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArweaveBlockRef {
    pub height: u64,
    pub index_in_block: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmTransaction {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub input: String,
    pub gas_price: String,
    pub gas_used: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmReceipt {
    pub status: bool,
    pub logs: Vec<EvmLog>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArweaveTransaction {
    pub id: String,
    pub owner: String,
    pub target: String,
    /// Decimal string, matching the Arweave wire format.
    pub quantity: String,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarcasterCast {
    pub hash: String,
    pub author_fid: u64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPubMessage {
    pub actor: String,
    pub object_id: String,
    pub activity_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssItem {
    pub feed_url: String,
    pub guid: String,
    pub title: String,
    pub link: String,
}
