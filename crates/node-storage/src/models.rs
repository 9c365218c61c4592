// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Diesel row types. `Activity`/`Checkpoint` (from `node-types`) are the
//! domain model; these are their on-the-wire row shapes, converted at the
//! store boundary so the rest of the workspace never depends on `diesel`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use node_types::{Activity, Checkpoint, CheckpointId, Network};
use std::str::FromStr;

use crate::schema::{activities, checkpoints};

#[derive(Queryable, Insertable)]
#[diesel(table_name = activities)]
pub struct ActivityRow {
    pub network: String,
    pub id: String,
    pub from_: String,
    pub to_: String,
    pub ty: String,
    pub tag: String,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
    pub status: bool,
    pub fee: serde_json::Value,
    pub actions: serde_json::Value,
}

impl From<&Activity> for ActivityRow {
    fn from(a: &Activity) -> Self {
        Self {
            network: a.network.to_string(),
            id: a.id.clone(),
            from_: a.from.clone(),
            to_: a.to.clone(),
            ty: a.ty.to_string(),
            tag: a.tag.to_string(),
            platform: a.platform.to_string(),
            timestamp: a.timestamp,
            status: a.status,
            fee: serde_json::to_value(&a.fee).expect("Fee serializes"),
            actions: serde_json::to_value(&a.actions).expect("actions serialize"),
        }
    }
}

impl ActivityRow {
    pub fn into_activity(self) -> Result<Activity, crate::StorageError> {
        Ok(Activity {
            network: Network::from_str(&self.network)
                .map_err(|_| crate::StorageError::Decode(format!("unknown network {}", self.network)))?,
            id: self.id,
            from: self.from_,
            to: self.to_,
            ty: node_types::Type::from_str(&self.ty)
                .map_err(|_| crate::StorageError::Decode(format!("unknown type {}", self.ty)))?,
            tag: node_types::Tag::from_str(&self.tag)
                .map_err(|_| crate::StorageError::Decode(format!("unknown tag {}", self.tag)))?,
            platform: node_types::Platform::from_str(&self.platform)
                .map_err(|_| crate::StorageError::Decode(format!("unknown platform {}", self.platform)))?,
            timestamp: self.timestamp,
            status: self.status,
            fee: serde_json::from_value(self.fee)
                .map_err(|e| crate::StorageError::Decode(e.to_string()))?,
            actions: serde_json::from_value(self.actions)
                .map_err(|e| crate::StorageError::Decode(e.to_string()))?,
        })
    }
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = checkpoints)]
pub struct CheckpointRow {
    pub network: String,
    pub worker: String,
    pub parameters_hash: String,
    pub state: Vec<u8>,
    pub index_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<&Checkpoint> for CheckpointRow {
    fn from(c: &Checkpoint) -> Self {
        Self {
            network: c.id.network.to_string(),
            worker: c.id.worker.clone(),
            parameters_hash: c.id.parameters_hash.clone(),
            state: c.state.clone(),
            index_count: c.index_count,
            updated_at: c.updated_at,
        }
    }
}

impl CheckpointRow {
    pub fn into_checkpoint(self) -> Result<Checkpoint, crate::StorageError> {
        Ok(Checkpoint {
            id: CheckpointId {
                network: Network::from_str(&self.network)
                    .map_err(|_| crate::StorageError::Decode(format!("unknown network {}", self.network)))?,
                worker: self.worker,
                parameters_hash: self.parameters_hash,
            },
            state: self.state,
            index_count: self.index_count,
            updated_at: self.updated_at,
        })
    }
}
