// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A background task publishing `{remote_state, indexed_state,
//! index_count, worker_status}` at a configurable interval (spec.md §4.4
//! "Progress"), decoupled from the commit cadence so a slow source still
//! emits a heartbeat.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use node_storage::{ProgressRecord, ProgressStore, WorkerStatus};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Shared, lock-free snapshot the engine loop updates and the monitor
/// task reads back on its own schedule.
#[derive(Default)]
pub struct ProgressSnapshot {
    remote_state: AtomicU64,
    indexed_state: AtomicU64,
    index_count: AtomicI64,
    status: Mutex<WorkerStatus>,
}

impl ProgressSnapshot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { status: Mutex::new(WorkerStatus::Unknown), ..Default::default() })
    }

    pub fn set_remote_state(&self, value: u64) {
        self.remote_state.store(value, Ordering::Relaxed);
    }

    pub fn set_indexed_state(&self, value: u64) {
        self.indexed_state.store(value, Ordering::Relaxed);
    }

    pub fn set_index_count(&self, value: i64) {
        self.index_count.store(value, Ordering::Relaxed);
    }

    pub fn set_status(&self, status: WorkerStatus) {
        *self.status.lock() = status;
    }

    fn record(&self) -> ProgressRecord {
        ProgressRecord {
            remote_state: self.remote_state.load(Ordering::Relaxed),
            indexed_state: self.indexed_state.load(Ordering::Relaxed),
            index_count: self.index_count.load(Ordering::Relaxed),
        }
    }

    fn status(&self) -> WorkerStatus {
        *self.status.lock()
    }
}

/// Runs until `cancel` fires, publishing the current snapshot every
/// `interval` (spec.md §4.4 "a monitor publishes, at configurable
/// interval").
pub async fn run_monitor(
    worker_id: String,
    snapshot: Arc<ProgressSnapshot>,
    progress_store: Arc<dyn ProgressStore>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                progress_store.set_progress(&worker_id, &snapshot.record()).await;
                progress_store.set_status(&worker_id, snapshot.status()).await;
            }
        }
    }
}
