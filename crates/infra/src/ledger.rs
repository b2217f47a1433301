//! Inventory ledger: the per-(book, location) stock counter.
//!
//! ## Adjustment Flow
//!
//! ```text
//! adjust_quantity(location, book, delta)
//!   ↓
//! 1. Load the entry with its book (absent → check location and book exist,
//!    materialize at 0)
//!   ↓
//! 2. Decide (pure): overflow / insufficient stock fail here, nothing written
//!   ↓
//! 3. Conditional save guarded by the version that was read
//!   ↓  (conflict → back to 1, up to `max_conflict_retries` extra attempts)
//! 4. Report the movement to the metrics sink
//! ```
//!
//! Every operation re-reads storage; the ledger holds no cached state.

use tracing::{debug, info, instrument, warn};

use shelfkeep_catalog::{BookCriterion, BookRecord};
use shelfkeep_core::{
    BookId, ExpectedVersion, Filter, LocationId, Page, PageRequest, Resource,
};
use shelfkeep_inventory::{
    Adjustment, InventoryEntry, InventoryKey, StockMovement, StockSortKey, StockedBook,
    ZeroDeltaPolicy,
};
use shelfkeep_observability::StockMetrics;

use crate::catalog::CatalogRegistry;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, StoreError};
use crate::inventory_store::InventoryStore;

/// Result of one committed attempt.
struct Committed {
    quantity: i64,
    adjustment: Option<Adjustment>,
    /// Read alongside the entry; supplies the metrics tags.
    book: Option<BookRecord>,
}

/// Per-location book stock ledger.
///
/// ## Generic Parameters
///
/// - `C`: catalog gateway (existence checks, genre/author lookup)
/// - `S`: inventory entry store
/// - `M`: stock movement metrics sink
#[derive(Debug, Clone)]
pub struct InventoryLedger<C, S, M> {
    catalog: C,
    store: S,
    metrics: M,
    config: LedgerConfig,
}

impl<C, S, M> InventoryLedger<C, S, M>
where
    C: CatalogRegistry,
    S: InventoryStore,
    M: StockMetrics,
{
    pub fn new(catalog: C, store: S, metrics: M, config: LedgerConfig) -> Self {
        Self {
            catalog,
            store,
            metrics,
            config,
        }
    }

    /// Add `delta` (negative to remove) to the stock of `book_id` at
    /// `location_id` and return the new quantity.
    ///
    /// The first adjustment of a pair creates its entry. A removal that would
    /// drive the quantity below zero fails with
    /// [`LedgerError::InsufficientStock`] and writes nothing.
    #[instrument(
        skip(self),
        fields(location_id = %location_id, book_id = %book_id),
        err
    )]
    pub async fn adjust_quantity(
        &self,
        location_id: LocationId,
        book_id: BookId,
        delta: i64,
    ) -> Result<i64, LedgerError> {
        let key = InventoryKey::new(book_id, location_id);
        let mut attempt: u32 = 0;

        let committed = loop {
            match self.try_adjust(key, delta).await {
                Err(LedgerError::Store(StoreError::Conflict(reason))) => {
                    if attempt >= self.config.max_conflict_retries {
                        warn!(%key, attempts = attempt + 1, %reason, "giving up after repeated conflicts");
                        return Err(LedgerError::Store(StoreError::Conflict(reason)));
                    }
                    attempt += 1;
                    debug!(%key, attempt, %reason, "concurrent modification, retrying");
                }
                other => break other?,
            }
        };

        if let Some(adjustment) = committed.adjustment {
            info!(
                %key,
                previous = adjustment.previous,
                quantity = adjustment.quantity,
                "stock adjusted"
            );
            if let (Some(movement), Some(book)) = (adjustment.movement(), &committed.book) {
                self.report(book, movement);
            }
        }

        Ok(committed.quantity)
    }

    async fn try_adjust(&self, key: InventoryKey, delta: i64) -> Result<Committed, LedgerError> {
        let (entry, book) = match self.store.find_stocked_entry(key).await? {
            Some(stocked) => stocked,
            None => {
                if !self.catalog.location_exists(key.location_id).await? {
                    return Err(LedgerError::NotFound(Resource::Location));
                }
                let book = self
                    .catalog
                    .find_book(key.book_id)
                    .await?
                    .ok_or(LedgerError::NotFound(Resource::Book))?;

                if delta == 0 && self.config.zero_delta == ZeroDeltaPolicy::Skip {
                    return Ok(Committed {
                        quantity: 0,
                        adjustment: None,
                        book: None,
                    });
                }
                (InventoryEntry::materialize(key), book)
            }
        };

        let adjustment = entry.decide(delta)?;
        let expected = ExpectedVersion::of(entry.version());
        let mut next = entry;
        next.apply(&adjustment)?;

        let saved = self.store.save_entry(next, expected).await?;
        Ok(Committed {
            quantity: saved.quantity(),
            adjustment: Some(adjustment),
            book: Some(book),
        })
    }

    /// Tag the movement with the book's genre and author.
    fn report(&self, book: &BookRecord, movement: StockMovement) {
        match movement {
            StockMovement::Restocked(n) => {
                self.metrics
                    .record_restocked(book.genre.as_str(), &book.author, n)
            }
            StockMovement::Sold(n) => self.metrics.record_sold(book.genre.as_str(), &book.author, n),
        }
    }

    /// Current stock of `book_id` at `location_id`; 0 when the pair has never
    /// been adjusted.
    #[instrument(skip(self), fields(location_id = %location_id, book_id = %book_id), err)]
    pub async fn get_quantity(
        &self,
        location_id: LocationId,
        book_id: BookId,
    ) -> Result<i64, LedgerError> {
        if !self.catalog.location_exists(location_id).await? {
            return Err(LedgerError::NotFound(Resource::Location));
        }
        if !self.catalog.book_exists(book_id).await? {
            return Err(LedgerError::NotFound(Resource::Book));
        }

        let key = InventoryKey::new(book_id, location_id);
        Ok(self
            .store
            .find_entry(key)
            .await?
            .map(|e| e.quantity())
            .unwrap_or(0))
    }

    /// One page of the books stocked at `location_id`, restricted by `filter`.
    ///
    /// The page size is capped at the configured maximum.
    #[instrument(
        skip(self, filter, page),
        fields(location_id = %location_id, page = page.page(), size = page.size()),
        err
    )]
    pub async fn list_inventory_at_location(
        &self,
        location_id: LocationId,
        page: PageRequest<StockSortKey>,
        filter: Filter<BookCriterion>,
    ) -> Result<Page<StockedBook>, LedgerError> {
        if !self.catalog.location_exists(location_id).await? {
            return Err(LedgerError::NotFound(Resource::Location));
        }

        let page = page.capped(self.config.max_page_size);
        Ok(self.store.find_page(location_id, &filter, &page).await?)
    }

    /// Build a page request, falling back to the configured default size.
    pub fn page_request(
        &self,
        page: u32,
        size: Option<u32>,
    ) -> Result<PageRequest<StockSortKey>, LedgerError> {
        let request = PageRequest::new(page, size.unwrap_or(self.config.default_page_size))?;
        Ok(request.capped(self.config.max_page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use shelfkeep_catalog::{
        Genre, Isbn, LocationRecord, author_like, genre_is, title_like,
    };
    use shelfkeep_core::predicate::{and, not};
    use shelfkeep_core::{Sort, UserId};
    use shelfkeep_observability::{InMemoryStockMetrics, StockMetric, Summary};

    use crate::catalog::InMemoryCatalog;
    use crate::inventory_store::InMemoryInventoryStore;

    type TestLedger = InventoryLedger<
        Arc<InMemoryCatalog>,
        Arc<InMemoryInventoryStore>,
        Arc<InMemoryStockMetrics>,
    >;

    struct Fixture {
        ledger: TestLedger,
        catalog: Arc<InMemoryCatalog>,
        store: Arc<InMemoryInventoryStore>,
        metrics: Arc<InMemoryStockMetrics>,
    }

    fn fixture_with(config: LedgerConfig) -> Fixture {
        let catalog = Arc::new(InMemoryCatalog::new());
        let store = Arc::new(InMemoryInventoryStore::new(catalog.clone()));
        let metrics = Arc::new(InMemoryStockMetrics::new());
        let ledger = InventoryLedger::new(catalog.clone(), store.clone(), metrics.clone(), config);
        Fixture {
            ledger,
            catalog,
            store,
            metrics,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(LedgerConfig::default())
    }

    async fn add_book(catalog: &InMemoryCatalog, title: &str, author: &str, genre: Genre, isbn: &str) -> BookId {
        catalog
            .save_book(BookRecord {
                id: BookId::new(),
                title: title.to_string(),
                author: author.to_string(),
                genre,
                isbn: Isbn::parse(isbn).unwrap(),
                publication_date: NaiveDate::from_ymd_opt(1990, 6, 1).unwrap(),
            })
            .await
            .unwrap()
            .id
    }

    async fn add_location(catalog: &InMemoryCatalog, name: &str) -> LocationId {
        catalog
            .save_location(LocationRecord {
                id: LocationId::new(),
                name: name.to_string(),
                address: "1 Main Street".to_string(),
                manager: UserId::new(),
            })
            .await
            .unwrap()
            .id
    }

    async fn dune_at_main(f: &Fixture) -> (LocationId, BookId) {
        let book = add_book(&f.catalog, "Dune", "Frank Herbert", Genre::ScienceFiction, "0306406152").await;
        let location = add_location(&f.catalog, "Main").await;
        (location, book)
    }

    #[tokio::test]
    async fn restock_then_sell_tracks_quantity_and_movements() {
        let f = fixture();
        let (loc, book) = dune_at_main(&f).await;

        assert_eq!(f.ledger.adjust_quantity(loc, book, 5).await.unwrap(), 5);
        assert_eq!(f.ledger.adjust_quantity(loc, book, -3).await.unwrap(), 2);
        assert_eq!(f.ledger.get_quantity(loc, book).await.unwrap(), 2);

        assert_eq!(
            f.metrics.summary(StockMetric::Restocked, "SCIENCE_FICTION", "Frank Herbert"),
            Some(Summary { count: 1, total: 5, max: 5 })
        );
        assert_eq!(
            f.metrics.summary(StockMetric::Sold, "SCIENCE_FICTION", "Frank Herbert"),
            Some(Summary { count: 1, total: 3, max: 3 })
        );
    }

    #[tokio::test]
    async fn overselling_fails_and_leaves_stock_untouched() {
        let f = fixture();
        let (loc, book) = dune_at_main(&f).await;
        f.ledger.adjust_quantity(loc, book, 2).await.unwrap();

        let err = f.ledger.adjust_quantity(loc, book, -5).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available: 2,
                requested: 5
            }
        );
        assert_eq!(f.ledger.get_quantity(loc, book).await.unwrap(), 2);
        assert_eq!(f.metrics.total(StockMetric::Sold).count, 0);
    }

    #[tokio::test]
    async fn first_sale_from_nothing_is_insufficient_and_creates_nothing() {
        let f = fixture();
        let (loc, book) = dune_at_main(&f).await;

        let err = f.ledger.adjust_quantity(loc, book, -1).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available: 0,
                requested: 1
            }
        );
        let key = InventoryKey::new(book, loc);
        assert!(f.store.find_entry(key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_location_or_book_is_not_found() {
        let f = fixture();
        let (loc, book) = dune_at_main(&f).await;
        let (missing_loc, missing_book) = (LocationId::new(), BookId::new());

        assert_eq!(
            f.ledger.adjust_quantity(missing_loc, book, 1).await.unwrap_err(),
            LedgerError::NotFound(Resource::Location)
        );
        assert!(f.store.find_entry(InventoryKey::new(book, missing_loc)).await.unwrap().is_none());
        assert_eq!(
            f.ledger.adjust_quantity(loc, missing_book, 1).await.unwrap_err(),
            LedgerError::NotFound(Resource::Book)
        );
        assert!(f.store.find_entry(InventoryKey::new(missing_book, loc)).await.unwrap().is_none());
        assert_eq!(f.metrics.total(StockMetric::Restocked).count, 0);
        assert_eq!(
            f.ledger.get_quantity(LocationId::new(), book).await.unwrap_err(),
            LedgerError::NotFound(Resource::Location)
        );
        assert_eq!(
            f.ledger.get_quantity(loc, BookId::new()).await.unwrap_err(),
            LedgerError::NotFound(Resource::Book)
        );
    }

    #[tokio::test]
    async fn location_is_checked_before_book() {
        let f = fixture();
        let err = f
            .ledger
            .adjust_quantity(LocationId::new(), BookId::new(), 1)
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::NotFound(Resource::Location));
    }

    #[tokio::test]
    async fn never_adjusted_pair_reads_zero() {
        let f = fixture();
        let (loc, book) = dune_at_main(&f).await;
        assert_eq!(f.ledger.get_quantity(loc, book).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn zero_delta_materializes_by_default() {
        let f = fixture();
        let (loc, book) = dune_at_main(&f).await;

        assert_eq!(f.ledger.adjust_quantity(loc, book, 0).await.unwrap(), 0);
        let entry = f.store.find_entry(InventoryKey::new(book, loc)).await.unwrap();
        assert_eq!(entry.map(|e| e.quantity()), Some(0));
        assert_eq!(f.metrics.total(StockMetric::Sold).count, 0);
        assert_eq!(f.metrics.total(StockMetric::Restocked).count, 0);
    }

    #[tokio::test]
    async fn zero_delta_skip_policy_writes_nothing() {
        let f = fixture_with(LedgerConfig {
            zero_delta: ZeroDeltaPolicy::Skip,
            ..LedgerConfig::default()
        });
        let (loc, book) = dune_at_main(&f).await;

        assert_eq!(f.ledger.adjust_quantity(loc, book, 0).await.unwrap(), 0);
        assert!(f.store.find_entry(InventoryKey::new(book, loc)).await.unwrap().is_none());

        // Existing entries are still written through.
        f.ledger.adjust_quantity(loc, book, 4).await.unwrap();
        assert_eq!(f.ledger.adjust_quantity(loc, book, 0).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn zero_delta_is_still_validated_against_the_catalog() {
        let f = fixture_with(LedgerConfig {
            zero_delta: ZeroDeltaPolicy::Skip,
            ..LedgerConfig::default()
        });
        let (loc, _) = dune_at_main(&f).await;
        assert_eq!(
            f.ledger.adjust_quantity(loc, BookId::new(), 0).await.unwrap_err(),
            LedgerError::NotFound(Resource::Book)
        );
    }

    #[tokio::test]
    async fn overflow_is_a_validation_failure() {
        let f = fixture();
        let (loc, book) = dune_at_main(&f).await;
        f.ledger.adjust_quantity(loc, book, i64::MAX).await.unwrap();

        let err = f.ledger.adjust_quantity(loc, book, 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(f.ledger.get_quantity(loc, book).await.unwrap(), i64::MAX);
    }

    #[tokio::test]
    async fn listing_filters_sorts_and_pages() {
        let f = fixture();
        let loc = add_location(&f.catalog, "Main").await;
        let other = add_location(&f.catalog, "Annex").await;
        let dune = add_book(&f.catalog, "Dune", "Frank Herbert", Genre::ScienceFiction, "0306406152").await;
        let messiah = add_book(&f.catalog, "Dune Messiah", "Frank Herbert", Genre::ScienceFiction, "9780306406157").await;
        let emma = add_book(&f.catalog, "Emma", "Jane Austen", Genre::Romance, "080442957X").await;

        f.ledger.adjust_quantity(loc, dune, 4).await.unwrap();
        f.ledger.adjust_quantity(loc, messiah, 9).await.unwrap();
        f.ledger.adjust_quantity(loc, emma, 1).await.unwrap();
        f.ledger.adjust_quantity(other, emma, 7).await.unwrap();

        let by_quantity = PageRequest::new(0, 10)
            .unwrap()
            .sorted(Sort::desc(StockSortKey::Quantity));
        let page = f
            .ledger
            .list_inventory_at_location(loc, by_quantity, None)
            .await
            .unwrap();
        let rows: Vec<_> = page.items.iter().map(|r| (r.book.title.as_str(), r.quantity)).collect();
        assert_eq!(rows, vec![("Dune Messiah", 9), ("Dune", 4), ("Emma", 1)]);
        assert_eq!(page.total, 3);

        let herbert_not_messiah = and(author_like(Some("HERBERT")), not(title_like(Some("messiah"))));
        let page = f
            .ledger
            .list_inventory_at_location(loc, by_quantity, herbert_not_messiah)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].book.id, dune);

        let romance = f
            .ledger
            .list_inventory_at_location(other, by_quantity, genre_is(Some(Genre::Romance)))
            .await
            .unwrap();
        assert_eq!(romance.items.len(), 1);
        assert_eq!(romance.items[0].quantity, 7);

        let by_title = PageRequest::new(1, 2)
            .unwrap()
            .sorted(Sort::asc(StockSortKey::Title));
        let second = f
            .ledger
            .list_inventory_at_location(loc, by_title, None)
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].book.title, "Emma");
        assert!(!second.has_more());
    }

    #[tokio::test]
    async fn listing_an_unknown_location_is_not_found() {
        let f = fixture();
        let page = f.ledger.page_request(0, None).unwrap();
        let err = f
            .ledger
            .list_inventory_at_location(LocationId::new(), page, None)
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::NotFound(Resource::Location));
    }

    #[tokio::test]
    async fn page_size_is_capped_by_config() {
        let f = fixture_with(LedgerConfig {
            default_page_size: 2,
            max_page_size: 3,
            ..LedgerConfig::default()
        });
        assert_eq!(f.ledger.page_request(0, None).unwrap().size(), 2);
        assert_eq!(f.ledger.page_request(0, Some(50)).unwrap().size(), 3);
        assert!(matches!(
            f.ledger.page_request(0, Some(0)),
            Err(LedgerError::Validation(_))
        ));

        let loc = add_location(&f.catalog, "Main").await;
        let oversized = PageRequest::new(0, 500).unwrap();
        let page = f
            .ledger
            .list_inventory_at_location(loc, oversized, None)
            .await
            .unwrap();
        assert_eq!(page.size, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sales_never_oversell() {
        let f = fixture();
        let (loc, book) = dune_at_main(&f).await;
        f.ledger.adjust_quantity(loc, book, 5).await.unwrap();

        let ledger = Arc::new(f.ledger);
        let a = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.adjust_quantity(loc, book, -3).await }
        });
        let b = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.adjust_quantity(loc, book, -4).await }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        // Exactly one wins; the loser sees the winner's result.
        let remaining = ledger.get_quantity(loc, book).await.unwrap();
        match (a, b) {
            (Ok(2), Err(LedgerError::InsufficientStock { available: 2, requested: 4 })) => {
                assert_eq!(remaining, 2)
            }
            (Err(LedgerError::InsufficientStock { available: 1, requested: 3 }), Ok(1)) => {
                assert_eq!(remaining, 1)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(f.metrics.total(StockMetric::Sold).count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_restocks_all_land() {
        const WRITERS: u32 = 16;
        // Each lost race is another writer's commit, so WRITERS retries always suffice.
        let f = fixture_with(LedgerConfig {
            max_conflict_retries: WRITERS,
            ..LedgerConfig::default()
        });
        let (loc, book) = dune_at_main(&f).await;
        let ledger = Arc::new(f.ledger);

        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.adjust_quantity(loc, book, 1).await })
            })
            .collect();
        let mut seen = Vec::new();
        for h in handles {
            seen.push(h.await.unwrap().unwrap());
        }

        seen.sort_unstable();
        assert_eq!(seen, (1..=i64::from(WRITERS)).collect::<Vec<_>>());
        assert_eq!(ledger.get_quantity(loc, book).await.unwrap(), i64::from(WRITERS));
        let restocked = f.metrics.total(StockMetric::Restocked);
        assert_eq!((restocked.count, restocked.total), (u64::from(WRITERS), u64::from(WRITERS)));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: final stock equals the sum of accepted deltas and never goes negative.
            #[test]
            fn ledger_conserves_stock(deltas in prop::collection::vec(-10i64..10, 1..30)) {
                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                rt.block_on(async {
                    let f = fixture();
                    let (loc, book) = dune_at_main(&f).await;
                    let mut accepted = 0i64;

                    for delta in deltas {
                        match f.ledger.adjust_quantity(loc, book, delta).await {
                            Ok(q) => {
                                accepted += delta;
                                prop_assert_eq!(q, accepted);
                            }
                            Err(LedgerError::InsufficientStock { available, requested }) => {
                                prop_assert_eq!(available, accepted);
                                prop_assert_eq!(requested, -delta);
                            }
                            Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                        }
                        prop_assert!(f.ledger.get_quantity(loc, book).await.unwrap() >= 0);
                    }

                    let restocked = f.metrics.total(StockMetric::Restocked).total as i64;
                    let sold = f.metrics.total(StockMetric::Sold).total as i64;
                    prop_assert_eq!(restocked - sold, accepted);
                    Ok(())
                })?;
            }
        }
    }
}
