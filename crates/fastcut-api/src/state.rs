//! Application state.

use std::sync::Arc;

use anyhow::Context;

use fastcut_backend::{create_backend, BackendConfig, OutputDestination, RenderBackend};
use fastcut_pipeline::{Reconciler, RenderService, StyleCatalog};
use fastcut_store::{GenerationStore, RedisGenerationStore, StoreConfig};

use crate::assets::{AssetServiceClient, AssetServiceConfig};
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn GenerationStore>,
    pub backend: Arc<dyn RenderBackend>,
    pub service: Arc<RenderService>,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn GenerationStore> = Arc::new(
            RedisGenerationStore::new(StoreConfig::from_env())
                .context("Failed to connect to the generation store")?,
        );
        let backend =
            create_backend(&BackendConfig::from_env()).context("Failed to create render backend")?;
        let assets = Arc::new(
            AssetServiceClient::new(AssetServiceConfig::from_env())
                .context("Failed to create asset service client")?,
        );

        let service = Arc::new(RenderService::new(
            store.clone(),
            backend.clone(),
            assets,
            StyleCatalog::with_builtin_sets(),
            OutputDestination::from_env(),
        ));
        let reconciler = Arc::new(Reconciler::new(store.clone(), backend.clone()));

        Ok(Self {
            config,
            store,
            backend,
            service,
            reconciler,
        })
    }
}
