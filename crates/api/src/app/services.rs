//! Infrastructure wiring: repositories, remote client, ingestor and sync engine.

use std::sync::Arc;

use stocksync_infra::{
    GraphqlInventoryClient, InMemoryInventoryRecordStore, InMemoryStockGroupResolver, InMemoryStoreDirectory,
    InMemoryWebhookLog, InventoryRecordStore, PostgresInventoryRecordStore, PostgresStockGroupResolver,
    PostgresStoreDirectory, PostgresWebhookLog, RemoteInventoryClient, StockGroupResolver, StoreDirectory,
    SyncConfig, SyncEngine, SyncSettings, WebhookHeaders, WebhookIngestor, WebhookLog, db,
};
use stocksync_observability::Logger;

/// The four storage-backed collaborators, behind their traits.
#[derive(Clone)]
pub struct Repositories {
    pub stores: Arc<dyn StoreDirectory>,
    pub groups: Arc<dyn StockGroupResolver>,
    pub records: Arc<dyn InventoryRecordStore>,
    pub webhook_log: Arc<dyn WebhookLog>,
}

impl Repositories {
    /// Empty in-memory repositories (dev/test).
    pub fn in_memory() -> Self {
        Self {
            stores: Arc::new(InMemoryStoreDirectory::new()),
            groups: Arc::new(InMemoryStockGroupResolver::new()),
            records: Arc::new(InMemoryInventoryRecordStore::new()),
            webhook_log: Arc::new(InMemoryWebhookLog::new()),
        }
    }

    pub async fn postgres(database_url: &str) -> anyhow::Result<Self> {
        let pool = db::connect(database_url).await?;
        Ok(Self {
            stores: Arc::new(PostgresStoreDirectory::new(pool.clone())),
            groups: Arc::new(PostgresStockGroupResolver::new(pool.clone())),
            records: Arc::new(PostgresInventoryRecordStore::new(pool.clone())),
            webhook_log: Arc::new(PostgresWebhookLog::new(pool)),
        })
    }

    /// Postgres when `DATABASE_URL` is configured, in-memory otherwise.
    pub async fn from_config(config: &SyncConfig) -> anyhow::Result<Self> {
        match &config.database_url {
            Some(url) => {
                tracing::info!("using Postgres repositories");
                Self::postgres(url).await
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using empty in-memory repositories");
                Ok(Self::in_memory())
            }
        }
    }
}

#[derive(Clone)]
pub struct AppServices {
    pub ingestor: WebhookIngestor,
    pub engine: SyncEngine,
    pub headers: WebhookHeaders,
}

impl AppServices {
    pub fn new(
        repositories: Repositories,
        remote: Arc<dyn RemoteInventoryClient>,
        settings: SyncSettings,
        headers: WebhookHeaders,
        logger: Logger,
    ) -> Self {
        let ingestor = WebhookIngestor::new(repositories.stores.clone(), logger.clone());
        let engine = SyncEngine::new(
            repositories.stores,
            repositories.groups,
            repositories.records,
            remote,
            repositories.webhook_log,
            settings,
            logger,
        );
        Self {
            ingestor,
            engine,
            headers,
        }
    }
}

/// Production wiring from configuration.
pub async fn build_services(config: &SyncConfig, logger: Logger) -> anyhow::Result<AppServices> {
    let repositories = Repositories::from_config(config).await?;
    let remote = GraphqlInventoryClient::new(config.remote.clone(), logger.clone())?;

    Ok(AppServices::new(
        repositories,
        Arc::new(remote),
        config.sync,
        config.webhook_headers.clone(),
        logger,
    ))
}
