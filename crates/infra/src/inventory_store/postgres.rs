//! Postgres-backed inventory store.
//!
//! ## Optimistic Concurrency
//!
//! `save_entry` is a single conditional statement chosen by the expectation:
//!
//! | Expected | Statement |
//! |---|---|
//! | `Absent` | `INSERT .. ON CONFLICT DO NOTHING` |
//! | `Exact(v)` | `UPDATE .. WHERE version = v` |
//!
//! Both return the new version. No returned row means another writer got
//! there first and maps to [`StoreError::Conflict`].

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{Span, instrument};

use shelfkeep_catalog::{BookCriterion, BookRecord, BookSortKey};
use shelfkeep_core::{BookId, ExpectedVersion, Filter, LocationId, Page, PageRequest};
use shelfkeep_inventory::{InventoryEntry, InventoryKey, StockSortKey, StockedBook};

use super::r#trait::InventoryStore;
use crate::catalog::postgres::{BOOK_COLUMNS, book_from_row, book_sort_column};
use crate::error::StoreError;
use crate::postgres::filter::push_filter;
use crate::postgres::{
    corrupt, direction_sql, limit_offset, map_sqlx_error, total_from, version_from, version_to,
};

#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn from_shared(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn stock_sort_column(key: StockSortKey) -> &'static str {
    match key {
        StockSortKey::BookId => "b.id",
        StockSortKey::Title => book_sort_column(BookSortKey::Title),
        StockSortKey::Author => book_sort_column(BookSortKey::Author),
        StockSortKey::PublicationDate => book_sort_column(BookSortKey::PublicationDate),
        StockSortKey::Quantity => "e.quantity",
    }
}

fn push_listing_from(
    qb: &mut QueryBuilder<'_, Postgres>,
    location_id: LocationId,
    filter: &Filter<BookCriterion>,
) {
    qb.push(" FROM inventory_entries e JOIN books b ON b.id = e.book_id WHERE e.location_id = ")
        .push_bind(*location_id.as_uuid())
        .push(" AND ");
    push_filter(qb, filter);
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(
        skip(self),
        fields(book_id = %key.book_id, location_id = %key.location_id),
        err
    )]
    async fn find_entry(&self, key: InventoryKey) -> Result<Option<InventoryEntry>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT quantity, version
            FROM inventory_entries
            WHERE book_id = $1 AND location_id = $2
            "#,
        )
        .bind(key.book_id.as_uuid())
        .bind(key.location_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_entry", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let quantity: i64 = row.try_get("quantity").map_err(|e| corrupt("find_entry", e))?;
        let version: i64 = row.try_get("version").map_err(|e| corrupt("find_entry", e))?;
        let entry = InventoryEntry::restore(key, quantity, version_from(version)?)
            .map_err(|e| corrupt("find_entry", e))?;
        Ok(Some(entry))
    }

    #[instrument(
        skip(self),
        fields(book_id = %key.book_id, location_id = %key.location_id),
        err
    )]
    async fn find_stocked_entry(
        &self,
        key: InventoryKey,
    ) -> Result<Option<(InventoryEntry, BookRecord)>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(BOOK_COLUMNS)
            .push(", e.quantity, e.version FROM inventory_entries e JOIN books b ON b.id = e.book_id WHERE e.book_id = ")
            .push_bind(*key.book_id.as_uuid())
            .push(" AND e.location_id = ")
            .push_bind(*key.location_id.as_uuid());

        let row = qb
            .build()
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_stocked_entry", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let book = book_from_row("find_stocked_entry", &row)?;
        let quantity: i64 = row
            .try_get("quantity")
            .map_err(|e| corrupt("find_stocked_entry", e))?;
        let version: i64 = row
            .try_get("version")
            .map_err(|e| corrupt("find_stocked_entry", e))?;
        let entry = InventoryEntry::restore(key, quantity, version_from(version)?)
            .map_err(|e| corrupt("find_stocked_entry", e))?;
        Ok(Some((entry, book)))
    }

    #[instrument(
        skip(self, entry),
        fields(
            book_id = %entry.key().book_id,
            location_id = %entry.key().location_id,
            quantity = entry.quantity(),
            expected = ?expected
        ),
        err
    )]
    async fn save_entry(
        &self,
        entry: InventoryEntry,
        expected: ExpectedVersion,
    ) -> Result<InventoryEntry, StoreError> {
        let key = entry.key();

        let query = match expected {
            ExpectedVersion::Absent => sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO inventory_entries (book_id, location_id, quantity, version)
                VALUES ($1, $2, $3, 1)
                ON CONFLICT (book_id, location_id) DO NOTHING
                RETURNING version
                "#,
            )
            .bind(*key.book_id.as_uuid())
            .bind(*key.location_id.as_uuid())
            .bind(entry.quantity()),
            ExpectedVersion::Exact(version) => sqlx::query_scalar::<_, i64>(
                r#"
                UPDATE inventory_entries
                SET quantity = $3, version = version + 1, updated_at = NOW()
                WHERE book_id = $1 AND location_id = $2 AND version = $4
                RETURNING version
                "#,
            )
            .bind(*key.book_id.as_uuid())
            .bind(*key.location_id.as_uuid())
            .bind(entry.quantity())
            .bind(version_to(version)?),
        };

        let version = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_entry", e))?
            .ok_or_else(|| {
                StoreError::Conflict(format!("{key}: expected {expected:?}, row moved"))
            })?;

        Ok(entry.committed(version_from(version)?))
    }

    #[instrument(
        skip(self, filter, page),
        fields(
            location_id = %location_id,
            page = page.page(),
            size = page.size(),
            total = tracing::field::Empty
        ),
        err
    )]
    async fn find_page(
        &self,
        location_id: LocationId,
        filter: &Filter<BookCriterion>,
        page: &PageRequest<StockSortKey>,
    ) -> Result<Page<StockedBook>, StoreError> {
        let (limit, offset) = limit_offset(page)?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        push_listing_from(&mut count, location_id, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_page", e))?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(BOOK_COLUMNS).push(", e.quantity");
        push_listing_from(&mut qb, location_id, filter);
        qb.push(" ORDER BY ");
        if let Some(sort) = page.sort() {
            qb.push(stock_sort_column(sort.key))
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
            .map_err(|e| map_sqlx_error("find_page", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let book = book_from_row("find_page", row)?;
            let quantity: i64 = row.try_get("quantity").map_err(|e| corrupt("find_page", e))?;
            items.push(StockedBook { book, quantity });
        }

        Span::current().record("total", total);
        Ok(Page {
            items,
            page: page.page(),
            size: page.size(),
            total: total_from(total),
        })
    }

    #[instrument(skip(self), fields(book_id = %book_id), err)]
    async fn remove_book(&self, book_id: BookId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM inventory_entries WHERE book_id = $1")
            .bind(book_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_book", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(location_id = %location_id), err)]
    async fn remove_location(&self, location_id: LocationId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM inventory_entries WHERE location_id = $1")
            .bind(location_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_location", e))?;
        Ok(result.rows_affected())
    }
}
