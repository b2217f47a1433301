//! Postgres-backed catalog.
//!
//! Uniqueness of `books.isbn` and `locations.name` is enforced by the schema;
//! violations surface as [`StoreError::Duplicate`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use shelfkeep_catalog::{
    BookCriterion, BookRecord, BookSortKey, Genre, Isbn, LocationCriterion, LocationRecord,
    LocationSortKey,
};
use shelfkeep_core::{BookId, Filter, LocationId, Page, PageRequest, UserId};

use super::r#trait::CatalogRegistry;
use crate::error::StoreError;
use crate::postgres::filter::push_filter;
use crate::postgres::{corrupt, direction_sql, limit_offset, map_sqlx_error, total_from};

pub(crate) const BOOK_COLUMNS: &str =
    "b.id, b.title, b.author, b.genre, b.isbn, b.publication_date";

const LOCATION_COLUMNS: &str = "l.id, l.name, l.address, l.manager_id";

#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: Arc<PgPool>,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn from_shared(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn find_book_where(
        &self,
        operation: &str,
        column: &str,
        bind: impl FnOnce(&mut QueryBuilder<'_, Postgres>),
    ) -> Result<Option<BookRecord>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(BOOK_COLUMNS)
            .push(" FROM books b WHERE ")
            .push(column)
            .push(" = ");
        bind(&mut qb);

        let row = qb
            .build()
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.as_ref().map(|r| book_from_row(operation, r)).transpose()
    }

    async fn find_location_where(
        &self,
        operation: &str,
        column: &str,
        bind: impl FnOnce(&mut QueryBuilder<'_, Postgres>),
    ) -> Result<Option<LocationRecord>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(LOCATION_COLUMNS)
            .push(" FROM locations l WHERE ")
            .push(column)
            .push(" = ");
        bind(&mut qb);

        let row = qb
            .build()
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.as_ref().map(|r| location_from_row(operation, r)).transpose()
    }
}

/// Decode a row selected with [`BOOK_COLUMNS`].
pub(crate) fn book_from_row(operation: &str, row: &PgRow) -> Result<BookRecord, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt(operation, e))?;
    let genre: String = row.try_get("genre").map_err(|e| corrupt(operation, e))?;
    let isbn: String = row.try_get("isbn").map_err(|e| corrupt(operation, e))?;
    let publication_date: NaiveDate = row
        .try_get("publication_date")
        .map_err(|e| corrupt(operation, e))?;

    Ok(BookRecord {
        id: BookId::from_uuid(id),
        title: row.try_get("title").map_err(|e| corrupt(operation, e))?,
        author: row.try_get("author").map_err(|e| corrupt(operation, e))?,
        genre: genre.parse::<Genre>().map_err(|e| corrupt(operation, e))?,
        isbn: Isbn::parse(&isbn).map_err(|e| corrupt(operation, e))?,
        publication_date,
    })
}

fn location_from_row(operation: &str, row: &PgRow) -> Result<LocationRecord, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt(operation, e))?;
    let manager: Uuid = row.try_get("manager_id").map_err(|e| corrupt(operation, e))?;
    Ok(LocationRecord {
        id: LocationId::from_uuid(id),
        name: row.try_get("name").map_err(|e| corrupt(operation, e))?,
        address: row.try_get("address").map_err(|e| corrupt(operation, e))?,
        manager: UserId::from_uuid(manager),
    })
}

/// Text columns sort in byte order (`COLLATE "C"`), the same order the
/// in-memory backends use.
pub(crate) fn book_sort_column(key: BookSortKey) -> &'static str {
    match key {
        BookSortKey::Title => r#"b.title COLLATE "C""#,
        BookSortKey::Author => r#"b.author COLLATE "C""#,
        BookSortKey::PublicationDate => "b.publication_date",
    }
}

fn location_sort_column(key: LocationSortKey) -> &'static str {
    match key {
        LocationSortKey::Name => r#"l.name COLLATE "C""#,
        LocationSortKey::Address => r#"l.address COLLATE "C""#,
    }
}

#[async_trait]
impl CatalogRegistry for PostgresCatalog {
    #[instrument(skip(self), fields(book_id = %id), err)]
    async fn book_exists(&self, id: BookId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("book_exists", e))
    }

    #[instrument(skip(self), fields(location_id = %id), err)]
    async fn location_exists(&self, id: LocationId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM locations WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("location_exists", e))
    }

    #[instrument(skip(self), err)]
    async fn has_books(&self) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM books)")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("has_books", e))
    }

    #[instrument(skip(self), fields(book_id = %id), err)]
    async fn find_book(&self, id: BookId) -> Result<Option<BookRecord>, StoreError> {
        self.find_book_where("find_book", "b.id", |qb| {
            qb.push_bind(*id.as_uuid());
        })
        .await
    }

    #[instrument(skip(self), fields(isbn = %isbn), err)]
    async fn find_book_by_isbn(&self, isbn: &Isbn) -> Result<Option<BookRecord>, StoreError> {
        let value = isbn.as_str().to_owned();
        self.find_book_where("find_book_by_isbn", "b.isbn", |qb| {
            qb.push_bind(value);
        })
        .await
    }

    #[instrument(skip(self), fields(location_id = %id), err)]
    async fn find_location(&self, id: LocationId) -> Result<Option<LocationRecord>, StoreError> {
        self.find_location_where("find_location", "l.id", |qb| {
            qb.push_bind(*id.as_uuid());
        })
        .await
    }

    #[instrument(skip(self), err)]
    async fn find_location_by_name(
        &self,
        name: &str,
    ) -> Result<Option<LocationRecord>, StoreError> {
        let value = name.to_owned();
        self.find_location_where("find_location_by_name", "l.name", |qb| {
            qb.push_bind(value);
        })
        .await
    }

    #[instrument(skip(self, book), fields(book_id = %book.id), err)]
    async fn save_book(&self, book: BookRecord) -> Result<BookRecord, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, genre, isbn, publication_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                author = EXCLUDED.author,
                genre = EXCLUDED.genre,
                isbn = EXCLUDED.isbn,
                publication_date = EXCLUDED.publication_date,
                updated_at = NOW()
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.genre.as_str())
        .bind(book.isbn.as_str())
        .bind(book.publication_date)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_book", e))?;

        Ok(book)
    }

    #[instrument(skip(self, location), fields(location_id = %location.id), err)]
    async fn save_location(&self, location: LocationRecord) -> Result<LocationRecord, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO locations (id, name, address, manager_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                address = EXCLUDED.address,
                manager_id = EXCLUDED.manager_id,
                updated_at = NOW()
            "#,
        )
        .bind(location.id.as_uuid())
        .bind(&location.name)
        .bind(&location.address)
        .bind(location.manager.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_location", e))?;

        Ok(location)
    }

    #[instrument(skip(self), fields(book_id = %id), err)]
    async fn delete_book(&self, id: BookId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_book", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(location_id = %id), err)]
    async fn delete_location(&self, id: LocationId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_location", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, filter, page), fields(page = page.page(), size = page.size(), total = tracing::field::Empty), err)]
    async fn search_books(
        &self,
        filter: &Filter<BookCriterion>,
        page: &PageRequest<BookSortKey>,
    ) -> Result<Page<BookRecord>, StoreError> {
        let (limit, offset) = limit_offset(page)?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b WHERE ");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_books", e))?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(BOOK_COLUMNS).push(" FROM books b WHERE ");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY ");
        if let Some(sort) = page.sort() {
            qb.push(book_sort_column(sort.key))
                .push(direction_sql(sort.direction))
                .push(", ");
        }
        qb.push("b.id ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_books", e))?;
        let items = rows
            .iter()
            .map(|r| book_from_row("search_books", r))
            .collect::<Result<Vec<_>, _>>()?;

        Span::current().record("total", total);
        Ok(Page {
            items,
            page: page.page(),
            size: page.size(),
            total: total_from(total),
        })
    }

    #[instrument(skip(self, filter, page), fields(page = page.page(), size = page.size(), total = tracing::field::Empty), err)]
    async fn search_locations(
        &self,
        filter: &Filter<LocationCriterion>,
        page: &PageRequest<LocationSortKey>,
    ) -> Result<Page<LocationRecord>, StoreError> {
        let (limit, offset) = limit_offset(page)?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM locations l WHERE ");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_locations", e))?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(LOCATION_COLUMNS).push(" FROM locations l WHERE ");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY ");
        if let Some(sort) = page.sort() {
            qb.push(location_sort_column(sort.key))
                .push(direction_sql(sort.direction))
                .push(", ");
        }
        qb.push("l.id ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_locations", e))?;
        let items = rows
            .iter()
            .map(|r| location_from_row("search_locations", r))
            .collect::<Result<Vec<_>, _>>()?;

        Span::current().record("total", total);
        Ok(Page {
            items,
            page: page.page(),
            size: page.size(),
            total: total_from(total),
        })
    }
}
