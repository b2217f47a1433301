use std::sync::Arc;

use async_trait::async_trait;

use shelfkeep_catalog::{BookCriterion, BookRecord};
use shelfkeep_core::{BookId, ExpectedVersion, Filter, LocationId, Page, PageRequest};
use shelfkeep_inventory::{InventoryEntry, InventoryKey, StockSortKey, StockedBook};

use crate::error::StoreError;

/// Storage of inventory entries, keyed by (book, location).
///
/// ## Optimistic Concurrency
///
/// Every stored entry carries a version (1 on first insert, +1 per write).
/// `save_entry` is a conditional write: it succeeds only when the stored
/// version matches `expected` (an absent key counts as version 0) and fails
/// with [`StoreError::Conflict`] otherwise, leaving the stored row untouched.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn find_entry(&self, key: InventoryKey) -> Result<Option<InventoryEntry>, StoreError>;

    /// The entry at `key` together with its book, read in one round trip.
    async fn find_stocked_entry(
        &self,
        key: InventoryKey,
    ) -> Result<Option<(InventoryEntry, BookRecord)>, StoreError>;

    /// Conditionally write `entry`. Returns the entry at its new version.
    async fn save_entry(
        &self,
        entry: InventoryEntry,
        expected: ExpectedVersion,
    ) -> Result<InventoryEntry, StoreError>;

    /// One page of the entries at `location_id`, joined with their books and
    /// restricted to books matching `filter`.
    ///
    /// Ordered by the requested sort, ties (and the unsorted case) broken by
    /// book id ascending.
    async fn find_page(
        &self,
        location_id: LocationId,
        filter: &Filter<BookCriterion>,
        page: &PageRequest<StockSortKey>,
    ) -> Result<Page<StockedBook>, StoreError>;

    /// Drop every entry of a book. Returns the number of entries removed.
    async fn remove_book(&self, book_id: BookId) -> Result<u64, StoreError>;

    /// Drop every entry at a location. Returns the number of entries removed.
    async fn remove_location(&self, location_id: LocationId) -> Result<u64, StoreError>;
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn find_entry(&self, key: InventoryKey) -> Result<Option<InventoryEntry>, StoreError> {
        (**self).find_entry(key).await
    }

    async fn find_stocked_entry(
        &self,
        key: InventoryKey,
    ) -> Result<Option<(InventoryEntry, BookRecord)>, StoreError> {
        (**self).find_stocked_entry(key).await
    }

    async fn save_entry(
        &self,
        entry: InventoryEntry,
        expected: ExpectedVersion,
    ) -> Result<InventoryEntry, StoreError> {
        (**self).save_entry(entry, expected).await
    }

    async fn find_page(
        &self,
        location_id: LocationId,
        filter: &Filter<BookCriterion>,
        page: &PageRequest<StockSortKey>,
    ) -> Result<Page<StockedBook>, StoreError> {
        (**self).find_page(location_id, filter, page).await
    }

    async fn remove_book(&self, book_id: BookId) -> Result<u64, StoreError> {
        (**self).remove_book(book_id).await
    }

    async fn remove_location(&self, location_id: LocationId) -> Result<u64, StoreError> {
        (**self).remove_location(location_id).await
    }
}
