// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    HistogramVec, IntCounterVec, Registry,
};

/// Source Client Pool metrics: retry counts and request latency, shared
/// across every protocol client (spec.md §4.1).
#[derive(Clone)]
pub struct SourceClientMetrics {
    pub retries: IntCounterVec,
    pub request_latency: HistogramVec,
}

impl SourceClientMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            retries: register_int_counter_vec_with_registry!(
                "source_client_retries",
                "Number of transient-error retries per client method",
                &["network", "method"],
                registry
            )
            .unwrap(),
            request_latency: register_histogram_vec_with_registry!(
                "source_client_request_latency_seconds",
                "Latency of a successful remote call",
                &["network", "method"],
                registry
            )
            .unwrap(),
        }
    }
}
