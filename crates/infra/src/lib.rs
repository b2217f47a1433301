//! Infrastructure layer: storage gateways, the inventory ledger, catalog
//! management and configuration.

pub mod catalog;
pub mod catalog_service;
pub mod config;
pub mod error;
pub mod inventory_store;
pub mod ledger;
pub mod postgres;


pub use catalog::{CatalogRegistry, InMemoryCatalog, PostgresCatalog};
pub use catalog_service::{CatalogHealth, CatalogService};
pub use config::{ConfigError, LedgerConfig};
pub use error::{CatalogError, LedgerError, StoreError};
pub use inventory_store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore};
pub use ledger::InventoryLedger;
