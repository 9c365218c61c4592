// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Fine-grained activity/action taxonomy. This is the subset needed by the
/// workers included in this repository; the taxonomy is a closed enum
/// extended by code change, per spec.md §9 "Variant payloads."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Type {
    TransactionTransfer,
    TransactionBridge,
    SocialMint,
    SocialPost,
}
