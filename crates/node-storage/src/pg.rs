// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Postgres-backed `Store`, grounded on `sui-indexer`'s
//! `new_pg_connection_pool`/`PgIndexerStore` shape: a `bb8` pool of
//! `diesel-async` connections, with `save_activities`/`save_checkpoint`
//! running inside one `AsyncPgConnection::transaction` per commit.

use async_trait::async_trait;
use bb8::Pool;
use diesel::prelude::*;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use node_types::{Activity, Checkpoint, CheckpointId, Network};

use crate::models::{ActivityRow, CheckpointRow};
use crate::query::{ActivityQuery, Direction};
use crate::schema::{activities, checkpoints};
use crate::{Store, StorageError, StoreTransaction};

diesel_migrations::embed_migrations!("migrations");

#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<AsyncDieselConnectionManager<AsyncPgConnection>>,
}

impl PgStore {
    pub async fn connect(config: &PgStoreConfig) -> Result<Self, StorageError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .build(manager)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Applies the embedded migrations (`node`'s `migrate` subcommand,
    /// SPEC_FULL.md §1 CLI). Uses a blocking `diesel::PgConnection` since
    /// `diesel_migrations` does not speak the async connection trait.
    pub fn run_migrations(database_url: &str) -> Result<(), StorageError> {
        use diesel_migrations::MigrationHarness;

        let mut conn = diesel::pg::PgConnection::establish(database_url)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, StorageError> {
        let mut conn = self
            .pool
            .get_owned()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // `diesel-async`'s closure-based `transaction()` builder does not
        // fit a `begin`/`save_*`/`commit` trait-object API spanning
        // multiple calls, so the transaction scope is opened and closed
        // with explicit statements instead, matching `sui-indexer`'s own
        // use of raw `BEGIN`/`COMMIT` for cross-call transactions.
        diesel::sql_query("BEGIN")
            .execute(&mut conn)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(Box::new(PgTransaction { conn: Some(conn) }))
    }

    async fn find_activity(
        &self,
        network: Network,
        id: &str,
    ) -> Result<Option<Activity>, StorageError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let row: Option<ActivityRow> = activities::table
            .filter(activities::network.eq(network.to_string()))
            .filter(activities::id.eq(id))
            .first(&mut *conn)
            .await
            .optional()
            .map_err(|e| StorageError::Query(e.to_string()))?;
        row.map(ActivityRow::into_activity).transpose()
    }

    async fn find_activities(&self, query: &ActivityQuery) -> Result<Vec<Activity>, StorageError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut stmt = activities::table.into_boxed();
        if let Some(owner) = &query.owner {
            stmt = stmt.filter(
                activities::from_
                    .eq(owner.clone())
                    .or(activities::to_.eq(owner.clone())),
            );
        }
        if let Some(network) = query.network {
            stmt = stmt.filter(activities::network.eq(network.to_string()));
        }
        if let Some(tag) = query.tag {
            stmt = stmt.filter(activities::tag.eq(tag.to_string()));
        }
        if let Some(ty) = query.ty {
            stmt = stmt.filter(activities::ty.eq(ty.to_string()));
        }
        if let Some(platform) = query.platform {
            stmt = stmt.filter(activities::platform.eq(platform.to_string()));
        }
        if let Some(since) = query.since {
            stmt = stmt.filter(activities::timestamp.ge(since));
        }
        if let Some(until) = query.until {
            stmt = stmt.filter(activities::timestamp.le(until));
        }

        let descending = !matches!(
            query.cursor.map(|c| c.direction),
            Some(Direction::Forward)
        );
        if let Some(cursor) = query.cursor {
            stmt = match cursor.direction {
                Direction::Forward => stmt.filter(activities::timestamp.gt(cursor.timestamp)),
                Direction::Backward => stmt.filter(activities::timestamp.lt(cursor.timestamp)),
            };
        }
        stmt = if descending {
            stmt.order(activities::timestamp.desc())
        } else {
            stmt.order(activities::timestamp.asc())
        };

        let rows: Vec<ActivityRow> = stmt
            .limit(query.limit.max(1) as i64)
            .load(&mut *conn)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        rows.into_iter().map(ActivityRow::into_activity).collect()
    }

    async fn load_checkpoint(&self, id: &CheckpointId) -> Result<Option<Checkpoint>, StorageError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let row: Option<CheckpointRow> = checkpoints::table
            .filter(checkpoints::network.eq(id.network.to_string()))
            .filter(checkpoints::worker.eq(&id.worker))
            .filter(checkpoints::parameters_hash.eq(&id.parameters_hash))
            .first(&mut *conn)
            .await
            .optional()
            .map_err(|e| StorageError::Query(e.to_string()))?;
        row.map(CheckpointRow::into_checkpoint).transpose()
    }

    async fn load_checkpoints(&self, network: Network) -> Result<Vec<Checkpoint>, StorageError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let rows: Vec<CheckpointRow> = checkpoints::table
            .filter(checkpoints::network.eq(network.to_string()))
            .load(&mut *conn)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        rows.into_iter().map(CheckpointRow::into_checkpoint).collect()
    }
}

struct PgTransaction {
    conn: Option<bb8::PooledConnection<'static, AsyncDieselConnectionManager<AsyncPgConnection>>>,
}

impl PgTransaction {
    fn conn(&mut self) -> &mut AsyncPgConnection {
        self.conn.as_mut().expect("transaction already finished")
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn save_activities(&mut self, batch: &[Activity]) -> Result<(), StorageError> {
        let conn = self.conn();
        for activity in batch {
            diesel::delete(activities::table)
                .filter(activities::network.eq(activity.network.to_string()))
                .filter(activities::id.eq(&activity.id))
                .execute(conn)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
            diesel::insert_into(activities::table)
                .values(ActivityRow::from(activity))
                .execute(conn)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }
        Ok(())
    }

    async fn save_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        let row = CheckpointRow::from(checkpoint);
        diesel::insert_into(checkpoints::table)
            .values(&row)
            .on_conflict((checkpoints::network, checkpoints::worker, checkpoints::parameters_hash))
            .do_update()
            .set((
                checkpoints::state.eq(&row.state),
                checkpoints::index_count.eq(row.index_count),
                checkpoints::updated_at.eq(row.updated_at),
            ))
            .execute(self.conn())
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        diesel::sql_query("COMMIT")
            .execute(self.conn())
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        self.conn.take();
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        diesel::sql_query("ROLLBACK")
            .execute(self.conn())
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        self.conn.take();
        Ok(())
    }
}
