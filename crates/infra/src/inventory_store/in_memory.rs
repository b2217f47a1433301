use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use shelfkeep_catalog::{BookCriterion, BookRecord};
use shelfkeep_core::predicate::matches;
use shelfkeep_core::{BookId, ExpectedVersion, Filter, LocationId, Page, PageRequest, Resource};
use shelfkeep_inventory::{InventoryEntry, InventoryKey, StockSortKey, StockedBook, listing_order};

use super::r#trait::InventoryStore;
use crate::catalog::InMemoryCatalog;
use crate::error::StoreError;

/// In-memory inventory store.
///
/// Intended for tests/dev. The version check and the write happen under one
/// write lock, so concurrent `save_entry` calls on the same key serialize and
/// the loser observes a conflict. Listings are joined against the shared
/// [`InMemoryCatalog`], which also stands in for foreign keys on insert.
#[derive(Debug)]
pub struct InMemoryInventoryStore {
    catalog: Arc<InMemoryCatalog>,
    entries: RwLock<HashMap<InventoryKey, InventoryEntry>>,
}

impl InMemoryInventoryStore {
    pub fn new(catalog: Arc<InMemoryCatalog>) -> Self {
        Self {
            catalog,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn check_references(&self, key: InventoryKey) -> Result<(), StoreError> {
        if !self.catalog.has_book(key.book_id)? {
            return Err(StoreError::MissingReference(Resource::Book));
        }
        if !self.catalog.has_location(key.location_id)? {
            return Err(StoreError::MissingReference(Resource::Location));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn find_entry(&self, key: InventoryKey) -> Result<Option<InventoryEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::poisoned())?;
        Ok(entries.get(&key).cloned())
    }

    async fn find_stocked_entry(
        &self,
        key: InventoryKey,
    ) -> Result<Option<(InventoryEntry, BookRecord)>, StoreError> {
        let Some(entry) = self.find_entry(key).await? else {
            return Ok(None);
        };
        Ok(self.catalog.book(key.book_id)?.map(|book| (entry, book)))
    }

    async fn save_entry(
        &self,
        entry: InventoryEntry,
        expected: ExpectedVersion,
    ) -> Result<InventoryEntry, StoreError> {
        let key = entry.key();
        let mut entries = self.entries.write().map_err(|_| StoreError::poisoned())?;

        let current = entries.get(&key).map(InventoryEntry::version).unwrap_or(0);
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "{key}: expected {expected:?}, stored version {current}"
            )));
        }
        if current == 0 {
            self.check_references(key)?;
        }

        let committed = entry.committed(current + 1);
        entries.insert(key, committed.clone());
        Ok(committed)
    }

    async fn find_page(
        &self,
        location_id: LocationId,
        filter: &Filter<BookCriterion>,
        page: &PageRequest<StockSortKey>,
    ) -> Result<Page<StockedBook>, StoreError> {
        let stocked: Vec<(BookId, i64)> = {
            let entries = self.entries.read().map_err(|_| StoreError::poisoned())?;
            entries
                .values()
                .filter(|e| e.key().location_id == location_id)
                .map(|e| (e.key().book_id, e.quantity()))
                .collect()
        };

        let mut rows = Vec::with_capacity(stocked.len());
        for (book_id, quantity) in stocked {
            // Entries whose book has vanished are not listed.
            if let Some(book) = self.catalog.book(book_id)? {
                if matches(filter, &book) {
                    rows.push(StockedBook { book, quantity });
                }
            }
        }

        rows.sort_by(|a, b| listing_order(page.sort(), a, b));
        Ok(Page::slice(rows, page))
    }

    async fn remove_book(&self, book_id: BookId) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::poisoned())?;
        let before = entries.len();
        entries.retain(|key, _| key.book_id != book_id);
        Ok((before - entries.len()) as u64)
    }

    async fn remove_location(&self, location_id: LocationId) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::poisoned())?;
        let before = entries.len();
        entries.retain(|key, _| key.location_id != location_id);
        Ok((before - entries.len()) as u64)
    }
}
