//! Inventory sync domain model.
//!
//! Stores, stock groups, the per-store SKU mapping and adjustment batching,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod adjustment;
pub mod record;
pub mod stock_group;
pub mod store;

pub use adjustment::{AdjustmentBatch, InventoryAdjustment, MAX_BATCH_SIZE, plan_batches};
pub use record::InventoryRecord;
pub use stock_group::{StockGroup, StockGroupMembership, siblings_of};
pub use store::{RemoteCredentials, Secret, Store, StoreAuth};
