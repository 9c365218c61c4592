// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Network, Platform, Tag, Type};

/// The canonical cross-protocol record emitted by a [`crate::Worker`]
/// (spec.md §3). `(network, id)` is the primary key; resaving the same id
/// replaces the whole `actions` list atomically (upsert-replace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub network: Network,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub ty: Type,
    pub tag: Tag,
    pub platform: Platform,
    pub timestamp: DateTime<Utc>,
    pub status: bool,
    pub fee: Fee,
    pub actions: Vec<Action>,
}

impl Activity {
    /// `(network, id)` composite primary key, used by the Activity Store
    /// and by tests asserting invariant 2 (idempotent upsert).
    pub fn key(&self) -> (Network, &str) {
        (self.network, self.id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fee {
    pub amount: String,
    pub decimal: u8,
    pub address: Option<String>,
}

/// One semantic operation within an [`Activity`]. Belongs to exactly one
/// Activity (spec.md §3); has no independent identity in storage, which
/// is why the store replaces the whole list rather than diffing it
/// (spec.md §9 "Idempotent upsert").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub ty: Type,
    pub platform: Platform,
    pub from: String,
    pub to: String,
    pub metadata: ActionMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionMetadata {
    Transfer {
        token: TokenAmount,
    },
    Bridge {
        action: BridgeAction,
        source: Network,
        target: Network,
        token: TokenAmount,
    },
    Mint {
        collection: String,
        token_id: Option<String>,
    },
    Post {
        body: String,
        uri: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeAction {
    Deposit,
    Withdraw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAmount {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Decimal string in the token's smallest unit, matching the wire
    /// format used across the original's metadata variants.
    pub value: String,
    pub address: Option<String>,
    pub standard: Option<String>,
}
