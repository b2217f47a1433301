use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use shelfkeep_catalog::{
    BookCriterion, BookRecord, BookSortKey, Isbn, LocationCriterion, LocationRecord,
    LocationSortKey,
};
use shelfkeep_core::predicate::matches;
use shelfkeep_core::{BookId, Entity, Filter, LocationId, Page, PageRequest};

use super::r#trait::CatalogRegistry;
use crate::error::StoreError;

/// In-memory catalog.
///
/// Intended for tests/dev. Searches scan every record.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    books: RwLock<HashMap<BookId, BookRecord>>,
    locations: RwLock<HashMap<LocationId, LocationRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous lookup used by the in-memory inventory store to join listings.
    pub(crate) fn book(&self, id: BookId) -> Result<Option<BookRecord>, StoreError> {
        let books = self.books.read().map_err(|_| StoreError::poisoned())?;
        Ok(books.get(&id).cloned())
    }

    pub(crate) fn has_book(&self, id: BookId) -> Result<bool, StoreError> {
        let books = self.books.read().map_err(|_| StoreError::poisoned())?;
        Ok(books.contains_key(&id))
    }

    pub(crate) fn has_location(&self, id: LocationId) -> Result<bool, StoreError> {
        let locations = self.locations.read().map_err(|_| StoreError::poisoned())?;
        Ok(locations.contains_key(&id))
    }
}

/// Insert or replace a record under its own identifier.
fn upsert<E: Entity + Clone>(records: &mut HashMap<E::Id, E>, record: &E) {
    records.insert(record.id().clone(), record.clone());
}

#[async_trait]
impl CatalogRegistry for InMemoryCatalog {
    async fn book_exists(&self, id: BookId) -> Result<bool, StoreError> {
        self.has_book(id)
    }

    async fn location_exists(&self, id: LocationId) -> Result<bool, StoreError> {
        self.has_location(id)
    }

    async fn has_books(&self) -> Result<bool, StoreError> {
        let books = self.books.read().map_err(|_| StoreError::poisoned())?;
        Ok(!books.is_empty())
    }

    async fn find_book(&self, id: BookId) -> Result<Option<BookRecord>, StoreError> {
        self.book(id)
    }

    async fn find_book_by_isbn(&self, isbn: &Isbn) -> Result<Option<BookRecord>, StoreError> {
        let books = self.books.read().map_err(|_| StoreError::poisoned())?;
        Ok(books.values().find(|b| b.isbn == *isbn).cloned())
    }

    async fn find_location(&self, id: LocationId) -> Result<Option<LocationRecord>, StoreError> {
        let locations = self.locations.read().map_err(|_| StoreError::poisoned())?;
        Ok(locations.get(&id).cloned())
    }

    async fn find_location_by_name(
        &self,
        name: &str,
    ) -> Result<Option<LocationRecord>, StoreError> {
        let locations = self.locations.read().map_err(|_| StoreError::poisoned())?;
        Ok(locations.values().find(|l| l.name == name).cloned())
    }

    async fn save_book(&self, book: BookRecord) -> Result<BookRecord, StoreError> {
        let mut books = self.books.write().map_err(|_| StoreError::poisoned())?;
        if books.values().any(|b| b.isbn == book.isbn && b.id != book.id) {
            return Err(StoreError::Duplicate(format!(
                "a book with ISBN {} already exists",
                book.isbn
            )));
        }
        upsert(&mut *books, &book);
        Ok(book)
    }

    async fn save_location(&self, location: LocationRecord) -> Result<LocationRecord, StoreError> {
        let mut locations = self.locations.write().map_err(|_| StoreError::poisoned())?;
        if locations
            .values()
            .any(|l| l.name == location.name && l.id != location.id)
        {
            return Err(StoreError::Duplicate(format!(
                "a location named '{}' already exists",
                location.name
            )));
        }
        upsert(&mut *locations, &location);
        Ok(location)
    }

    async fn delete_book(&self, id: BookId) -> Result<bool, StoreError> {
        let mut books = self.books.write().map_err(|_| StoreError::poisoned())?;
        Ok(books.remove(&id).is_some())
    }

    async fn delete_location(&self, id: LocationId) -> Result<bool, StoreError> {
        let mut locations = self.locations.write().map_err(|_| StoreError::poisoned())?;
        Ok(locations.remove(&id).is_some())
    }

    async fn search_books(
        &self,
        filter: &Filter<BookCriterion>,
        page: &PageRequest<BookSortKey>,
    ) -> Result<Page<BookRecord>, StoreError> {
        let books = self.books.read().map_err(|_| StoreError::poisoned())?;
        let mut hits: Vec<BookRecord> = books
            .values()
            .filter(|b| matches(filter, b))
            .cloned()
            .collect();
        drop(books);

        hits.sort_by(|a, b| {
            let primary = match page.sort() {
                Some(s) => s.orient(s.key.compare(a, b)),
                None => core::cmp::Ordering::Equal,
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });
        Ok(Page::slice(hits, page))
    }

    async fn search_locations(
        &self,
        filter: &Filter<LocationCriterion>,
        page: &PageRequest<LocationSortKey>,
    ) -> Result<Page<LocationRecord>, StoreError> {
        let locations = self.locations.read().map_err(|_| StoreError::poisoned())?;
        let mut hits: Vec<LocationRecord> = locations
            .values()
            .filter(|l| matches(filter, l))
            .cloned()
            .collect();
        drop(locations);

        hits.sort_by(|a, b| {
            let primary = match page.sort() {
                Some(s) => s.orient(s.key.compare(a, b)),
                None => core::cmp::Ordering::Equal,
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });
        Ok(Page::slice(hits, page))
    }
}
