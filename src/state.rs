use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clients::{GooglePlacesClient, PlacesDirectory};
use crate::config::Config;
use crate::db::Store;
use crate::services::{PlaceService, SeaOrmPlaceService};

/// Build a shared HTTP client with reasonable defaults for API calls.
/// Reused across all HTTP-based services to enable connection pooling
/// and avoid socket exhaustion.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Placedex/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub directory: Arc<dyn PlacesDirectory>,

    pub place_service: Arc<dyn PlaceService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(config.directory.request_timeout_seconds.into())?;

        let directory: Arc<dyn PlacesDirectory> = match &config.directory.base_url {
            Some(base_url) => Arc::new(GooglePlacesClient::with_base_url(
                http_client,
                base_url.clone(),
                config.directory.api_key.clone(),
            )),
            None => Arc::new(GooglePlacesClient::with_shared_client(
                http_client,
                config.directory.api_key.clone(),
            )),
        };

        Self::with_directory(config, directory).await
    }

    /// Wire up state around an externally supplied directory client.
    /// Tests use this to swap in scripted directories.
    pub async fn with_directory(
        config: Config,
        directory: Arc<dyn PlacesDirectory>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let max_concurrent_details = config.directory.max_concurrent_details;
        let config = Arc::new(RwLock::new(config));

        let place_service: Arc<dyn PlaceService> = Arc::new(SeaOrmPlaceService::new(
            store.clone(),
            directory.clone(),
            max_concurrent_details,
        ));

        Ok(Self {
            config,
            store,
            directory,
            place_service,
        })
    }
}
