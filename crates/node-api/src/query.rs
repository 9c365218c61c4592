// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Query-string shape for `GET /activities`, translating into
//! `node_storage::ActivityQuery` (spec.md §4.5: "filters on owner,
//! network, tag, type, platform, time range, and forward/backward
//! cursor pagination").

use chrono::{DateTime, Utc};
use node_storage::{ActivityQuery, Cursor, Direction};
use node_types::{Network, Platform, Tag, Type};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivitiesQueryParams {
    pub owner: Option<String>,
    pub network: Option<Network>,
    pub tag: Option<Tag>,
    #[serde(rename = "type")]
    pub ty: Option<Type>,
    pub platform: Option<Platform>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub cursor_timestamp: Option<DateTime<Utc>>,
    pub cursor_direction: Option<CursorDirection>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorDirection {
    Forward,
    Backward,
}

impl ActivitiesQueryParams {
    pub fn into_query(self) -> Result<ActivityQuery, ApiError> {
        let cursor = match (self.cursor_timestamp, self.cursor_direction) {
            (Some(timestamp), Some(direction)) => Some(Cursor {
                timestamp,
                direction: match direction {
                    CursorDirection::Forward => Direction::Forward,
                    CursorDirection::Backward => Direction::Backward,
                },
            }),
            (None, None) => None,
            _ => {
                return Err(ApiError::BadRequest(
                    "cursor_timestamp and cursor_direction must be given together".to_string(),
                ))
            }
        };

        Ok(ActivityQuery {
            owner: self.owner,
            network: self.network,
            tag: self.tag,
            ty: self.ty,
            platform: self.platform,
            since: self.since,
            until: self.until,
            cursor,
            limit: self.limit.unwrap_or(50),
        })
    }
}
