// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The platform a [`crate::Activity`] is attributed to. Distinct from
/// [`crate::Network`]: several platforms can share a network (e.g. many
/// DApp workers run on `Ethereum`), and the Optimism bridge worker
/// produces activities tagged `Platform::Optimism` from tasks sourced on
/// `Network::Ethereum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
    Optimism,
    ArweaveNative,
    Kiwistand,
    Rss3,
}
