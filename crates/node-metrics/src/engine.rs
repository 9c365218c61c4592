// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_int_gauge_vec_with_registry, IntGauge, IntGaugeVec, Registry,
};

/// Per-instance indexer engine metrics, one label-set per `(network,
/// worker, parameters_hash)`, mirroring `sui-indexer`'s
/// `IndexerMetrics::new(&registry)` construction.
#[derive(Clone)]
pub struct EngineMetrics {
    pub remote_head: IntGaugeVec,
    pub indexed_height: IntGaugeVec,
    pub index_count: IntGaugeVec,
    /// 0=preparing 1=ready 2=indexing 3=unhealthy 4=unknown, matching
    /// the `worker_status` enum in spec.md §4.4.
    pub worker_status: IntGaugeVec,
    pub pump_restarts: IntGaugeVec,
    /// Occupancy of the producer→transformer and transformer→sink
    /// channels (spec.md §9 "Backpressure"), labelled additionally by
    /// `stage`.
    pub queue_depth: IntGaugeVec,
}

const LABELS: &[&str] = &["network", "worker", "parameters_hash"];

impl EngineMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            remote_head: register_int_gauge_vec_with_registry!(
                "indexer_remote_head",
                "Highest known position at the remote source",
                LABELS,
                registry
            )
            .unwrap(),
            indexed_height: register_int_gauge_vec_with_registry!(
                "indexer_indexed_height",
                "Highest committed checkpoint position",
                LABELS,
                registry
            )
            .unwrap(),
            index_count: register_int_gauge_vec_with_registry!(
                "indexer_index_count",
                "Cumulative number of activities committed",
                LABELS,
                registry
            )
            .unwrap(),
            worker_status: register_int_gauge_vec_with_registry!(
                "indexer_worker_status",
                "Instance worker status, see WorkerStatus for the encoding",
                LABELS,
                registry
            )
            .unwrap(),
            pump_restarts: register_int_gauge_vec_with_registry!(
                "indexer_pump_restarts",
                "Consecutive pump-loop restarts without progress",
                LABELS,
                registry
            )
            .unwrap(),
            queue_depth: register_int_gauge_vec_with_registry!(
                "indexer_queue_depth",
                "Occupancy of an in-process pipeline channel",
                &["network", "worker", "parameters_hash", "stage"],
                registry
            )
            .unwrap(),
        }
    }

    /// A channel occupancy gauge scoped to one instance and pipeline
    /// stage, handed to `node_metrics::channel::channel` (spec.md §9
    /// "Backpressure").
    pub fn queue_gauge(&self, network: &str, worker: &str, parameters_hash: &str, stage: &str) -> IntGauge {
        self.queue_depth.with_label_values(&[network, worker, parameters_hash, stage])
    }

    pub fn remote_head_gauge(&self, network: &str, worker: &str, parameters_hash: &str) -> IntGauge {
        self.remote_head.with_label_values(&[network, worker, parameters_hash])
    }

    pub fn indexed_height_gauge(&self, network: &str, worker: &str, parameters_hash: &str) -> IntGauge {
        self.indexed_height.with_label_values(&[network, worker, parameters_hash])
    }

    pub fn index_count_gauge(&self, network: &str, worker: &str, parameters_hash: &str) -> IntGauge {
        self.index_count.with_label_values(&[network, worker, parameters_hash])
    }

    pub fn worker_status_gauge(&self, network: &str, worker: &str, parameters_hash: &str) -> IntGauge {
        self.worker_status.with_label_values(&[network, worker, parameters_hash])
    }

    pub fn pump_restarts_gauge(&self, network: &str, worker: &str, parameters_hash: &str) -> IntGauge {
        self.pump_restarts.with_label_values(&[network, worker, parameters_hash])
    }
}
