//! Inventory domain module.
//!
//! This crate contains the business rules for the per-(book, location) stock
//! counter, implemented purely as deterministic domain logic (no IO, no
//! storage). Persistence and orchestration live in `shelfkeep-infra`.

pub mod entry;
pub mod stocked;

pub use entry::{Adjustment, InventoryEntry, InventoryKey, StockMovement, ZeroDeltaPolicy};
pub use stocked::{StockSortKey, StockedBook, listing_order};
