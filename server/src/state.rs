//! Shared application state handed to every route.

use std::sync::Arc;

use anyhow::{Context, Result};
use streamgate_core::{KvStorage, RegistryError, StreamsClient};
use streamgate_evm::AbiEncoder;
use streamgate_observability::GatewayMetrics;
use streamgate_registry::{FsStorage, SchemaRegistry};
use streamgate_rpc::{RpcClientConfig, RpcStreamsClient};
use streamgate_stream::{BroadcastRouter, ClientHub, MemoryStreams, SubscriptionRegistry};
use tracing::info;

use crate::config::{Backend, GatewayConfig};
use crate::pipeline::PublishPipeline;

/// Publisher used by the `memory` backend when writes are enabled only
/// through a signing key.
pub const LOCAL_PUBLISHER: &str = "0x0000000000000000000000000000000000000001";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub remote: Arc<dyn StreamsClient>,
    pub registry: Arc<SchemaRegistry>,
    pub hub: Arc<ClientHub>,
    pub router: Arc<BroadcastRouter>,
    pub subscriptions: Arc<SubscriptionRegistry>,
    pub pipeline: Arc<PublishPipeline>,
    pub metrics: GatewayMetrics,
}

impl AppState {
    /// Wire the gateway around an already-built storage and remote.
    pub async fn new(
        config: GatewayConfig,
        storage: Arc<dyn KvStorage>,
        remote: Arc<dyn StreamsClient>,
    ) -> Result<Self, RegistryError> {
        let timeout = config.remote_timeout();
        let registry = Arc::new(SchemaRegistry::open(storage, remote.clone(), timeout).await?);
        let metrics = GatewayMetrics::new();
        let hub = Arc::new(ClientHub::new());
        let router = Arc::new(BroadcastRouter::new(
            hub.clone(),
            registry.clone(),
            metrics.clone(),
        ));
        let subscriptions = Arc::new(SubscriptionRegistry::new(
            remote.clone(),
            router.clone(),
            timeout,
        ));
        let pipeline = Arc::new(PublishPipeline::new(
            registry.clone(),
            remote.clone(),
            Arc::new(AbiEncoder::new()),
            metrics.clone(),
            timeout,
            config.has_wallet(),
        ));
        Ok(Self {
            config: Arc::new(config),
            remote,
            registry,
            hub,
            router,
            subscriptions,
            pipeline,
            metrics,
        })
    }

    /// Build the configured backend and file storage under `data_dir`.
    pub async fn from_config(config: GatewayConfig) -> Result<Self> {
        let remote = remote_for(&config)?;
        let storage: Arc<dyn KvStorage> = Arc::new(FsStorage::new(config.data_dir.clone()));
        info!(
            backend = config.backend.as_str(),
            data_dir = %config.data_dir.display(),
            "opening schema stores"
        );
        Self::new(config, storage, remote)
            .await
            .context("loading schema stores")
    }
}

/// The streams ledger selected by `config.backend`.
pub fn remote_for(config: &GatewayConfig) -> Result<Arc<dyn StreamsClient>> {
    Ok(match config.backend {
        Backend::Memory => {
            let streams = if config.has_wallet() {
                let publisher = config.publisher.as_deref().unwrap_or(LOCAL_PUBLISHER);
                MemoryStreams::with_publisher(publisher)
            } else {
                MemoryStreams::new()
            };
            Arc::new(streams)
        }
        Backend::Rpc => Arc::new(
            RpcStreamsClient::new(RpcClientConfig {
                rpc_url: config.rpc_url.clone(),
                streams_url: config.streams_url.clone(),
                publisher: config.publisher.clone(),
                request_timeout: config.remote_timeout(),
            })
            .with_context(|| format!("connecting to streams node at {}", config.rpc_url))?,
        ),
    })
}
