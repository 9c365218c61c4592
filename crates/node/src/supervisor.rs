// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wires one [`InstanceConfig`] to a running [`IndexerEngine`]: resolves
//! its worker, builds a [`DataSourceFactory`] for its network's protocol
//! family, and constructs the engine with the process-wide stores and
//! metrics (spec.md §4.4 step 1, SPEC_FULL.md §3).

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use node_config::{InstanceConfig, NetworkEndpointConfig, NodeConfig};
use node_datasource::{
    ActivityPubDataSource, ArweaveDataSource, ArweaveDataSourceConfig, DataSource, EvmDataSource,
    EvmDataSourceConfig, FarcasterDataSource, RssDataSource,
};
use node_engine::{DataSourceFactory, EngineConfig, IndexerEngine};
use node_metrics::{EngineMetrics, SourceClientMetrics};
use node_source_clients::{ActivityPubClient, ArweaveGatewayClient, EvmRpcClient, FarcasterHubClient, RssFetchClient};
use node_storage::{ProgressStore, Store, StreamSink};
use node_types::{CheckpointId, Filter, Network, NetworkSource};
use node_worker::{
    ArweaveBundleFallbackWorker, ArweaveNativeTransferWorker, KiwistandWorker, OptimismBridgeWorker, Worker,
};
use url::Url;

/// Resolves one instance's worker by name, applying any filter-shaping
/// parameters it declares (spec.md §4.3 "`filter()`", SPEC_FULL.md §3
/// `InstanceConfig.parameters`).
pub fn build_worker(instance: &InstanceConfig) -> Result<Arc<dyn Worker>> {
    let params = &instance.parameters;
    match instance.worker.as_str() {
        "optimism-bridge" => {
            let mut worker = OptimismBridgeWorker::new();
            if let Some(addresses) = string_array(params, "bridge_addresses") {
                worker = worker.with_bridge_addresses(addresses);
            }
            Ok(Arc::new(worker))
        }
        "arweave-native-transfer" => Ok(Arc::new(ArweaveNativeTransferWorker::new())),
        "arweave-bundle-fallback" => {
            let mut worker = ArweaveBundleFallbackWorker::new();
            if let Some(owners) = string_array(params, "bundler_owners") {
                worker = worker.with_bundler_owners(owners);
            }
            Ok(Arc::new(worker))
        }
        "kiwistand" => {
            let contract = params
                .get("contract_address")
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow!("kiwistand instance requires parameters.contract_address"))?;
            Ok(Arc::new(KiwistandWorker::new(contract)))
        }
        other => Err(anyhow!("no worker named {other:?} is registered")),
    }
}

fn string_array(params: &serde_json::Value, key: &str) -> Option<Vec<String>> {
    params
        .get(key)?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn endpoint_config<'a>(config: &'a NodeConfig, network: Network) -> Result<&'a NetworkEndpointConfig> {
    config
        .networks
        .get(&network)
        .ok_or_else(|| anyhow!("no networks.{network} endpoint configured"))
}

fn required_url(params: &serde_json::Value, key: &str) -> Result<Url> {
    let raw = params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("instance is missing required parameters.{key}"))?;
    Url::parse(raw).with_context(|| format!("parameters.{key} is not a valid URL"))
}

/// Builds the `DataSourceFactory` an [`IndexerEngine`] uses to reconstruct
/// a fresh [`DataSource`] from the latest persisted checkpoint state on
/// every restart cycle (spec.md §4.2, §4.4; see `node-engine`'s doc
/// comment on `DataSourceFactory` for why reconstruction, not resumption
/// in place, is required).
pub fn build_data_source_factory(
    config: &NodeConfig,
    instance: &InstanceConfig,
    filter: Filter,
    source_metrics: SourceClientMetrics,
) -> Result<DataSourceFactory> {
    let network = instance.network;
    let block_start = instance.block_start;
    let block_target = instance.block_target;
    let concurrent_block_requests = instance.concurrent_block_requests;

    match network.source() {
        NetworkSource::Evm => {
            let endpoint = endpoint_config(config, network)?;
            let client = EvmRpcClient::new(
                Url::parse(&endpoint.endpoint).with_context(|| format!("networks.{network}.endpoint"))?,
                endpoint.concurrent_requests,
            );
            let ds_config = EvmDataSourceConfig { block_start, block_target, concurrent_block_requests };
            Ok(Box::new(move |state: &[u8]| {
                Box::new(
                    EvmDataSource::new(network, client.clone(), filter.clone(), state, ds_config.clone())
                        .with_metrics(source_metrics.clone()),
                ) as Box<dyn DataSource>
            }))
        }
        NetworkSource::Arweave => {
            let endpoint = endpoint_config(config, network)?;
            let client = ArweaveGatewayClient::new(
                Url::parse(&endpoint.endpoint).with_context(|| format!("networks.{network}.endpoint"))?,
                endpoint.concurrent_requests,
            );
            let bundler_owners = string_array(&instance.parameters, "bundler_owners").unwrap_or_default();
            let ds_config = ArweaveDataSourceConfig { block_start, block_target, concurrent_block_requests, bundler_owners };
            Ok(Box::new(move |state: &[u8]| {
                Box::new(
                    ArweaveDataSource::new(client.clone(), filter.clone(), state, ds_config.clone())
                        .with_metrics(source_metrics.clone()),
                ) as Box<dyn DataSource>
            }))
        }
        NetworkSource::Farcaster => {
            let endpoint = endpoint_config(config, network)?;
            let client = FarcasterHubClient::new(&endpoint.endpoint, endpoint.concurrent_requests)
                .with_context(|| format!("networks.{network}.endpoint"))?;
            Ok(Box::new(move |state: &[u8]| {
                Box::new(FarcasterDataSource::new(client.clone(), state).with_metrics(source_metrics.clone()))
                    as Box<dyn DataSource>
            }))
        }
        NetworkSource::ActivityPub => {
            let endpoint = endpoint_config(config, network)?;
            let client = ActivityPubClient::new(endpoint.concurrent_requests);
            let outbox_url = required_url(&instance.parameters, "outbox_url")?;
            Ok(Box::new(move |state: &[u8]| {
                Box::new(
                    ActivityPubDataSource::new(client.clone(), outbox_url.clone(), state)
                        .with_metrics(source_metrics.clone()),
                ) as Box<dyn DataSource>
            }))
        }
        NetworkSource::Rss => {
            let endpoint = endpoint_config(config, network)?;
            let client = RssFetchClient::new(endpoint.concurrent_requests);
            let feed_url = required_url(&instance.parameters, "feed_url")?;
            Ok(Box::new(move |state: &[u8]| {
                Box::new(RssDataSource::new(client.clone(), feed_url.clone(), state).with_metrics(source_metrics.clone()))
                    as Box<dyn DataSource>
            }))
        }
    }
}

/// Assembles one `InstanceConfig` into a ready-to-spawn [`IndexerEngine`]
/// (spec.md §4.4 step 1: "one Indexer Engine per configured instance").
#[allow(clippy::too_many_arguments)]
pub fn build_engine(
    config: &NodeConfig,
    instance: &InstanceConfig,
    store: Arc<dyn Store>,
    stream_sink: Arc<dyn StreamSink>,
    progress_store: Arc<dyn ProgressStore>,
    engine_metrics: EngineMetrics,
    source_metrics: SourceClientMetrics,
) -> Result<IndexerEngine> {
    let worker = build_worker(instance)?;
    let filter = worker.filter();
    let id = CheckpointId::new(instance.network, instance.worker.clone(), &instance.parameters);
    let make_data_source = build_data_source_factory(config, instance, filter, source_metrics)?;

    let engine_config = EngineConfig {
        concurrent_transforms: instance.concurrent_transforms(),
        progress_interval: std::time::Duration::from_secs(instance.progress_interval_secs),
        unhealthy_after_restarts: instance.unhealthy_after_restarts,
    };

    Ok(IndexerEngine::new(
        id,
        make_data_source,
        worker,
        store,
        stream_sink,
        progress_store,
        engine_metrics,
        engine_config,
    ))
}
