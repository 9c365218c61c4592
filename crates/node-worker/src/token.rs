// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Token metadata lookup (spec.md §4.3: "Token metadata lookup is
//! allowed; it is expected to be cached by the lookup client"). A real
//! deployment backs this with an on-chain `symbol()`/`decimals()` call
//! behind a cache; workers only depend on the trait, so tests can supply
//! a static table without touching the network.

use node_types::Network;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub standard: Option<String>,
}

pub trait TokenMetadataLookup: Send + Sync {
    /// Returns `None` for an unrecognized `(network, address)` pair; the
    /// caller falls back to a minimal placeholder rather than failing the
    /// whole transform (a malformed *event* is skipped, not the task).
    fn lookup(&self, network: Network, address: &str) -> Option<TokenMetadata>;
}

/// A fixed table, memoized by construction rather than by call (spec.md
/// §8 invariant 5: "deterministic modulo that cache").
#[derive(Default)]
pub struct StaticTokenMetadataLookup {
    table: HashMap<(Network, String), TokenMetadata>,
}

impl StaticTokenMetadataLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, network: Network, address: &str, metadata: TokenMetadata) -> Self {
        self.table.insert((network, address.to_lowercase()), metadata);
        self
    }

    /// The common-case well-known tokens this workspace's bundled workers
    /// reference directly (spec.md §8 S2's USDC fixture).
    pub fn with_well_known_tokens(self) -> Self {
        self.with_token(
            Network::Ethereum,
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            TokenMetadata {
                name: "USD Coin".to_string(),
                symbol: "USDC".to_string(),
                decimals: 6,
                standard: Some("erc20".to_string()),
            },
        )
    }
}

impl TokenMetadataLookup for StaticTokenMetadataLookup {
    fn lookup(&self, network: Network, address: &str) -> Option<TokenMetadata> {
        self.table.get(&(network, address.to_lowercase())).cloned()
    }
}
