//! Book and location management on top of the catalog gateway.
//!
//! Deleting a book or a location also drops its inventory entries.

use tracing::{info, instrument};

use shelfkeep_catalog::{
    BookCriterion, BookRecord, BookSortKey, LocationCriterion, LocationRecord, LocationSortKey,
    NewBook, NewLocation,
};
use shelfkeep_core::{BookId, Filter, LocationId, Page, PageRequest, Resource};

use crate::catalog::CatalogRegistry;
use crate::error::CatalogError;
use crate::inventory_store::InventoryStore;

/// Readiness of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogHealth {
    /// At least one book is catalogued.
    Up,
    Down { reason: &'static str },
}

#[derive(Debug, Clone)]
pub struct CatalogService<C, S> {
    catalog: C,
    store: S,
    max_page_size: u32,
}

impl<C, S> CatalogService<C, S>
where
    C: CatalogRegistry,
    S: InventoryStore,
{
    pub fn new(catalog: C, store: S, max_page_size: u32) -> Self {
        Self {
            catalog,
            store,
            max_page_size,
        }
    }

    #[instrument(skip(self, book), fields(isbn = %book.isbn), err)]
    pub async fn create_book(&self, book: NewBook) -> Result<BookRecord, CatalogError> {
        book.validate()?;
        if self.catalog.find_book_by_isbn(&book.isbn).await?.is_some() {
            return Err(CatalogError::Conflict(format!(
                "a book with ISBN {} already exists",
                book.isbn
            )));
        }

        let saved = self
            .catalog
            .save_book(BookRecord::from_new(BookId::new(), book))
            .await?;
        info!(book_id = %saved.id, title = %saved.title, "book created");
        Ok(saved)
    }

    #[instrument(skip(self, book), fields(book_id = %id), err)]
    pub async fn update_book(&self, id: BookId, book: NewBook) -> Result<BookRecord, CatalogError> {
        book.validate()?;
        let mut existing = self
            .catalog
            .find_book(id)
            .await?
            .ok_or(CatalogError::NotFound(Resource::Book))?;

        if let Some(holder) = self.catalog.find_book_by_isbn(&book.isbn).await? {
            if holder.id != id {
                return Err(CatalogError::Conflict(format!(
                    "ISBN {} belongs to another book",
                    book.isbn
                )));
            }
        }

        existing.apply_update(book);
        let saved = self.catalog.save_book(existing).await?;
        info!(book_id = %saved.id, "book updated");
        Ok(saved)
    }

    #[instrument(skip(self), fields(book_id = %id), err)]
    pub async fn delete_book(&self, id: BookId) -> Result<(), CatalogError> {
        if !self.catalog.delete_book(id).await? {
            return Err(CatalogError::NotFound(Resource::Book));
        }
        let removed = self.store.remove_book(id).await?;
        info!(book_id = %id, entries_removed = removed, "book deleted");
        Ok(())
    }

    pub async fn get_book(&self, id: BookId) -> Result<BookRecord, CatalogError> {
        self.catalog
            .find_book(id)
            .await?
            .ok_or(CatalogError::NotFound(Resource::Book))
    }

    pub async fn search_books(
        &self,
        filter: Filter<BookCriterion>,
        page: PageRequest<BookSortKey>,
    ) -> Result<Page<BookRecord>, CatalogError> {
        let page = page.capped(self.max_page_size);
        Ok(self.catalog.search_books(&filter, &page).await?)
    }

    #[instrument(skip(self, location), fields(name = %location.name), err)]
    pub async fn create_location(
        &self,
        location: NewLocation,
    ) -> Result<LocationRecord, CatalogError> {
        location.validate()?;
        if self
            .catalog
            .find_location_by_name(&location.name)
            .await?
            .is_some()
        {
            return Err(CatalogError::Conflict(format!(
                "a location named '{}' already exists",
                location.name
            )));
        }

        let saved = self
            .catalog
            .save_location(LocationRecord::from_new(LocationId::new(), location))
            .await?;
        info!(location_id = %saved.id, name = %saved.name, "location created");
        Ok(saved)
    }

    #[instrument(skip(self, location), fields(location_id = %id), err)]
    pub async fn update_location(
        &self,
        id: LocationId,
        location: NewLocation,
    ) -> Result<LocationRecord, CatalogError> {
        location.validate()?;
        let mut existing = self
            .catalog
            .find_location(id)
            .await?
            .ok_or(CatalogError::NotFound(Resource::Location))?;

        if let Some(holder) = self.catalog.find_location_by_name(&location.name).await? {
            if holder.id != id {
                return Err(CatalogError::Conflict(format!(
                    "location name '{}' is taken",
                    location.name
                )));
            }
        }

        existing.apply_update(location);
        let saved = self.catalog.save_location(existing).await?;
        info!(location_id = %saved.id, "location updated");
        Ok(saved)
    }

    #[instrument(skip(self), fields(location_id = %id), err)]
    pub async fn delete_location(&self, id: LocationId) -> Result<(), CatalogError> {
        if !self.catalog.delete_location(id).await? {
            return Err(CatalogError::NotFound(Resource::Location));
        }
        let removed = self.store.remove_location(id).await?;
        info!(location_id = %id, entries_removed = removed, "location deleted");
        Ok(())
    }

    pub async fn get_location(&self, id: LocationId) -> Result<LocationRecord, CatalogError> {
        self.catalog
            .find_location(id)
            .await?
            .ok_or(CatalogError::NotFound(Resource::Location))
    }

    pub async fn search_locations(
        &self,
        filter: Filter<LocationCriterion>,
        page: PageRequest<LocationSortKey>,
    ) -> Result<Page<LocationRecord>, CatalogError> {
        let page = page.capped(self.max_page_size);
        Ok(self.catalog.search_locations(&filter, &page).await?)
    }

    /// Up once the catalog holds a book. Backend errors propagate.
    #[instrument(skip(self), err)]
    pub async fn health(&self) -> Result<CatalogHealth, CatalogError> {
        if self.catalog.has_books().await? {
            Ok(CatalogHealth::Up)
        } else {
            Ok(CatalogHealth::Down {
                reason: "no books in the catalog",
            })
        }
    }
}
