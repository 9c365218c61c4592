// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The Source Client Pool (spec.md §4.1): one small async surface per
//! protocol family, each wrapped at the call site in
//! [`node_retry::with_retry`] and bounded by its own `Semaphore`. No
//! common `SourceClient` trait — the primitives aren't uniform across
//! protocols, so each client exposes its own inherent methods (spec.md §9
//! "Variant payloads... dispatch via pattern matching").

mod activitypub;
mod arweave;
mod error;
mod evm;
mod farcaster;
mod rss;

pub use activitypub::ActivityPubClient;
pub use arweave::{ArweaveBlockSummary, ArweaveGatewayClient};
pub use error::ClientError;
pub use evm::{EvmBlockSummary, EvmRpcClient};
pub use farcaster::FarcasterHubClient;
pub use rss::RssFetchClient;
