//! `stocksync-core` — shared building blocks for the stock sync engine.
//!
//! This crate contains **pure** primitives (no IO, no HTTP, no storage).

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{CompanyId, StockGroupId, StoreId};
pub use value_object::{LocationId, RemoteInventoryItemId, ShopDomain, Sku};
