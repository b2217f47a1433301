use std::sync::Arc;

use async_trait::async_trait;

use shelfkeep_catalog::{
    BookCriterion, BookRecord, BookSortKey, Isbn, LocationCriterion, LocationRecord,
    LocationSortKey,
};
use shelfkeep_core::{BookId, Filter, LocationId, Page, PageRequest};

use crate::error::StoreError;

/// Read/write access to catalogued books and locations.
///
/// The inventory ledger only needs the existence checks and `find_book`; the
/// rest backs [`crate::catalog_service::CatalogService`].
///
/// Uniqueness of ISBNs and location names is enforced by the implementation:
/// a violating `save_*` fails with [`StoreError::Duplicate`].
#[async_trait]
pub trait CatalogRegistry: Send + Sync {
    async fn book_exists(&self, id: BookId) -> Result<bool, StoreError>;

    async fn location_exists(&self, id: LocationId) -> Result<bool, StoreError>;

    /// Whether at least one book is catalogued. Never counts the whole table.
    async fn has_books(&self) -> Result<bool, StoreError>;

    async fn find_book(&self, id: BookId) -> Result<Option<BookRecord>, StoreError>;

    async fn find_book_by_isbn(&self, isbn: &Isbn) -> Result<Option<BookRecord>, StoreError>;

    async fn find_location(&self, id: LocationId) -> Result<Option<LocationRecord>, StoreError>;

    async fn find_location_by_name(
        &self,
        name: &str,
    ) -> Result<Option<LocationRecord>, StoreError>;

    /// Insert or replace by id.
    async fn save_book(&self, book: BookRecord) -> Result<BookRecord, StoreError>;

    /// Insert or replace by id.
    async fn save_location(&self, location: LocationRecord) -> Result<LocationRecord, StoreError>;

    /// `false` when no such book existed.
    async fn delete_book(&self, id: BookId) -> Result<bool, StoreError>;

    /// `false` when no such location existed.
    async fn delete_location(&self, id: LocationId) -> Result<bool, StoreError>;

    /// Filtered, paged book search. Without a sort, rows come back by id.
    async fn search_books(
        &self,
        filter: &Filter<BookCriterion>,
        page: &PageRequest<BookSortKey>,
    ) -> Result<Page<BookRecord>, StoreError>;

    /// Filtered, paged location search. Without a sort, rows come back by id.
    async fn search_locations(
        &self,
        filter: &Filter<LocationCriterion>,
        page: &PageRequest<LocationSortKey>,
    ) -> Result<Page<LocationRecord>, StoreError>;
}

#[async_trait]
impl<S> CatalogRegistry for Arc<S>
where
    S: CatalogRegistry + ?Sized,
{
    async fn book_exists(&self, id: BookId) -> Result<bool, StoreError> {
        (**self).book_exists(id).await
    }

    async fn location_exists(&self, id: LocationId) -> Result<bool, StoreError> {
        (**self).location_exists(id).await
    }

    async fn has_books(&self) -> Result<bool, StoreError> {
        (**self).has_books().await
    }

    async fn find_book(&self, id: BookId) -> Result<Option<BookRecord>, StoreError> {
        (**self).find_book(id).await
    }

    async fn find_book_by_isbn(&self, isbn: &Isbn) -> Result<Option<BookRecord>, StoreError> {
        (**self).find_book_by_isbn(isbn).await
    }

    async fn find_location(&self, id: LocationId) -> Result<Option<LocationRecord>, StoreError> {
        (**self).find_location(id).await
    }

    async fn find_location_by_name(
        &self,
        name: &str,
    ) -> Result<Option<LocationRecord>, StoreError> {
        (**self).find_location_by_name(name).await
    }

    async fn save_book(&self, book: BookRecord) -> Result<BookRecord, StoreError> {
        (**self).save_book(book).await
    }

    async fn save_location(&self, location: LocationRecord) -> Result<LocationRecord, StoreError> {
        (**self).save_location(location).await
    }

    async fn delete_book(&self, id: BookId) -> Result<bool, StoreError> {
        (**self).delete_book(id).await
    }

    async fn delete_location(&self, id: LocationId) -> Result<bool, StoreError> {
        (**self).delete_location(id).await
    }

    async fn search_books(
        &self,
        filter: &Filter<BookCriterion>,
        page: &PageRequest<BookSortKey>,
    ) -> Result<Page<BookRecord>, StoreError> {
        (**self).search_books(filter, page).await
    }

    async fn search_locations(
        &self,
        filter: &Filter<LocationCriterion>,
        page: &PageRequest<LocationSortKey>,
    ) -> Result<Page<LocationRecord>, StoreError> {
        (**self).search_locations(filter, page).await
    }
}
