//! Infrastructure layer: config, repositories, remote storefront client,
//! webhook ingestion and the sync engine.

pub mod backfill;
pub mod config;
pub mod db;
pub mod ingest;
pub mod inventory_records;
pub mod remote;
pub mod stock_groups;
pub mod stores;
pub mod sync_engine;
pub mod webhook_log;

pub use backfill::{Backfill, BackfillReport, StoreBackfill};
pub use config::{ConfigError, RemoteConfig, SyncConfig, WebhookHeaders};
pub use ingest::{IngestError, IngestedWebhook, WebhookIngestor, WebhookRequest};
pub use inventory_records::{InMemoryInventoryRecordStore, InventoryRecordError, InventoryRecordStore, PostgresInventoryRecordStore};
pub use remote::{
    AdjustmentResult, GraphqlInventoryClient, PerItemError, RemoteError, RemoteInventoryClient, RemoteVariant, VariantPage,
};
pub use stock_groups::{InMemoryStockGroupResolver, PostgresStockGroupResolver, StockGroupError, StockGroupResolver};
pub use stores::{InMemoryStoreDirectory, PostgresStoreDirectory, StoreDirectory, StoreDirectoryError};
pub use sync_engine::{
    Diagnostic, DiagnosticKind, SiblingSummary, StoreSequencer, SyncEngine, SyncError, SyncOutcome, SyncReport, SyncSettings,
};
pub use webhook_log::{InMemoryWebhookLog, PostgresWebhookLog, WebhookLog, WebhookLogError};

#[cfg(test)]
mod integration_tests;
