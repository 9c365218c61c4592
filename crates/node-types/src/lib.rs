// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The canonical data model shared by every other crate in the indexer:
//! [`Network`], [`Task`], [`Activity`], [`Action`], [`Filter`] and
//! [`Checkpoint`]. Kept dependency-light and synchronous; no crate here
//! should need an async runtime.

mod activity;
mod checkpoint;
mod filter;
mod network;
mod platform;
mod tag;
mod task;
mod ty;

pub use activity::{Action, ActionMetadata, Activity, Fee, TokenAmount};
pub use checkpoint::{Checkpoint, CheckpointId};
pub use filter::Filter;
pub use network::{Network, NetworkSource};
pub use platform::Platform;
pub use tag::Tag;
pub use task::{
    ActivityPubMessage, ArweaveBlockRef, ArweaveTransaction, EvmBlockRef, EvmLog, EvmReceipt,
    EvmTransaction, FarcasterCast, RssItem, Task, TaskPayload,
};
pub use ty::Type;
