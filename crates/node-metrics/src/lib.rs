// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Prometheus registry bootstrap and per-crate metrics structs, grounded on
//! `mysten-metrics`'s `metered_channel` (a gauge-tracked `mpsc` wrapper)
//! and `sui-indexer`'s `IndexerMetrics::new(&registry)` convention.

mod channel;
mod engine;
mod source;

pub use channel::{channel, MeteredReceiver, MeteredSender};
pub use engine::EngineMetrics;
pub use source::SourceClientMetrics;

use prometheus::Registry;

/// Creates the process-wide registry. Both `EngineMetrics` and
/// `SourceClientMetrics` are registered against the same registry so a
/// single `/metrics` endpoint (see `node-api`) exports everything.
pub fn new_registry() -> Registry {
    Registry::new_custom(Some("node".to_string()), None).expect("static metric names are valid")
}
