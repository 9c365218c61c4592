// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use node_types::{Network, Platform, Tag, Type};

/// Filter + pagination parameters for `Store::find_activities` (spec.md
/// §4.5: "supports filters on owner, network, tag, type, platform, time
/// range, and forward/backward cursor pagination").
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
    pub owner: Option<String>,
    pub network: Option<Network>,
    pub tag: Option<Tag>,
    pub ty: Option<Type>,
    pub platform: Option<Platform>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub cursor: Option<Cursor>,
    pub limit: u32,
}

impl ActivityQuery {
    pub fn new() -> Self {
        Self {
            limit: default_limit(),
            ..Default::default()
        }
    }
}

fn default_limit() -> u32 {
    50
}

/// An opaque timestamp position, encoding "everything strictly
/// before/after this row" in timestamp-descending order — Activities have
/// no monotonic integer id, so the cursor is the sort key itself rather
/// than an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}
