// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI entry point (SPEC_FULL.md §1 "CLI bootstrapping"): loads
//! configuration, wires up telemetry, storage, the Source Client Pool,
//! the Worker Registry, and one `IndexerEngine` per configured instance,
//! then serves the HTTP query API and Prometheus exporter until
//! cancelled. Exit codes follow spec.md §6: `0` on graceful cancellation,
//! `1` on terminal error.

mod supervisor;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use clap::{Parser, Subcommand};
use node_config::NodeConfig;
use node_metrics::{EngineMetrics, SourceClientMetrics};
use node_storage::{LogStreamSink, MemoryStore, NoopProgressStore, PgStore, PgStoreConfig, RedisProgressStore, Store};
use prometheus::{Encoder, Registry, TextEncoder};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "node", about = "Decentralized activity-indexing Node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every configured instance until cancelled.
    Run {
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
    },
    /// Write a minimal starter configuration to `out`.
    GenerateConfig {
        #[arg(long, default_value = "config.yaml")]
        out: PathBuf,
    },
    /// Apply pending Postgres migrations and exit.
    Migrate {
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("failed to start the tokio runtime")?;
    let result = runtime.block_on(dispatch(cli.command));
    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

async fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run { config } => run(config).await,
        Command::GenerateConfig { out } => generate_config(out),
        Command::Migrate { config } => migrate(config).await,
    }
}

fn generate_config(out: PathBuf) -> Result<()> {
    let sample = r#"database:
  url: "postgres://localhost/node"
  pool_size: 16
metrics_bind_address: "0.0.0.0:9184"
api_bind_address: "0.0.0.0:8080"
json_logs: false
log_filter: "info"
networks:
  ethereum:
    endpoint: "https://eth.example.com"
    concurrent_requests: 8
instances:
  - network: ethereum
    worker: optimism-bridge
    parameters:
      contract: "0x1234"
"#;
    std::fs::write(&out, sample).with_context(|| format!("failed to write {}", out.display()))?;
    println!("wrote starter configuration to {}", out.display());
    Ok(())
}

async fn migrate(config_path: PathBuf) -> Result<()> {
    let config = NodeConfig::from_file(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    tokio::task::spawn_blocking(move || PgStore::run_migrations(&config.database.url))
        .await
        .context("migration task panicked")??;
    println!("migrations applied");
    Ok(())
}

async fn run(config_path: PathBuf) -> Result<()> {
    let config = NodeConfig::from_file(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let _telemetry_guard = node_telemetry::init(&node_telemetry::TelemetryConfig {
        json_logs: config.json_logs,
        filter: config.log_filter.clone(),
    });

    let registry = node_metrics::new_registry();
    let engine_metrics = EngineMetrics::new(&registry);
    let source_metrics = SourceClientMetrics::new(&registry);

    let store: Arc<dyn Store> = match std::env::var("NODE_STORE_BACKEND").as_deref() {
        Ok("memory") => {
            tracing::warn!("NODE_STORE_BACKEND=memory — not for production use");
            Arc::new(MemoryStore::new())
        }
        _ => {
            let pg = PgStore::connect(&PgStoreConfig {
                url: config.database.url.clone(),
                pool_size: config.database.pool_size,
            })
            .await
            .context("failed to connect to the Activity/Checkpoint store")?;
            Arc::new(pg)
        }
    };

    let progress_store: Arc<dyn node_storage::ProgressStore> = match &config.redis {
        Some(redis) => Arc::new(RedisProgressStore::new(&redis.url).context("failed to build the Redis progress store")?),
        None => {
            tracing::info!("no redis configured, progress publish is a no-op");
            Arc::new(NoopProgressStore)
        }
    };

    let stream_sink: Arc<dyn node_storage::StreamSink> = Arc::new(LogStreamSink);

    let cancel = CancellationToken::new();

    let mut engine_handles = Vec::new();
    for instance in &config.instances {
        let engine = supervisor::build_engine(
            &config,
            instance,
            store.clone(),
            stream_sink.clone(),
            progress_store.clone(),
            engine_metrics.clone(),
            source_metrics.clone(),
        )
        .with_context(|| format!("failed to build instance {}:{}", instance.network, instance.worker))?;

        let instance_cancel = cancel.clone();
        engine_handles.push(tokio::spawn(async move { engine.run(instance_cancel).await }));
    }

    let api_listener = tokio::net::TcpListener::bind(&config.api_bind_address)
        .await
        .with_context(|| format!("failed to bind query API on {}", config.api_bind_address))?;
    let api_router = node_api::router(store.clone());
    let api_cancel = cancel.clone();
    let api_server = tokio::spawn(async move {
        axum::serve(api_listener, api_router)
            .with_graceful_shutdown(async move { api_cancel.cancelled().await })
            .await
    });

    let metrics_listener = tokio::net::TcpListener::bind(&config.metrics_bind_address)
        .await
        .with_context(|| format!("failed to bind metrics exporter on {}", config.metrics_bind_address))?;
    let metrics_router = metrics_router(registry);
    let metrics_cancel = cancel.clone();
    let metrics_server = tokio::spawn(async move {
        axum::serve(metrics_listener, metrics_router)
            .with_graceful_shutdown(async move { metrics_cancel.cancelled().await })
            .await
    });

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received shutdown signal, cancelling all instances");
            cancel.cancel();
        }
    });

    for handle in engine_handles {
        handle.await.context("an indexer engine task panicked")??;
    }
    api_server.await.context("the query API server task panicked")??;
    metrics_server.await.context("the metrics exporter task panicked")??;

    Ok(())
}

fn metrics_router(registry: Registry) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let registry = registry.clone();
            async move {
                let encoder = TextEncoder::new();
                let metric_families = registry.gather();
                let mut buffer = Vec::new();
                encoder.encode(&metric_families, &mut buffer).expect("prometheus encoding never fails");
                ([("content-type", encoder.format_type().to_string())], buffer)
            }
        }),
    )
}
