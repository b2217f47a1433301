use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use shelfkeep_catalog::BookRecord;
use shelfkeep_core::Sort;

/// One row of a location's inventory listing: a book and its live quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockedBook {
    pub book: BookRecord,
    pub quantity: i64,
}

/// Sortable columns of an inventory listing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockSortKey {
    /// Storage default order.
    #[default]
    BookId,
    Title,
    Author,
    PublicationDate,
    Quantity,
}

impl StockSortKey {
    /// Ascending comparison on this key alone.
    pub fn compare(&self, a: &StockedBook, b: &StockedBook) -> Ordering {
        match self {
            StockSortKey::BookId => a.book.id.cmp(&b.book.id),
            StockSortKey::Title => a.book.title.cmp(&b.book.title),
            StockSortKey::Author => a.book.author.cmp(&b.book.author),
            StockSortKey::PublicationDate => a.book.publication_date.cmp(&b.book.publication_date),
            StockSortKey::Quantity => a.quantity.cmp(&b.quantity),
        }
    }
}

/// Total order for a listing: the requested sort (or book id), ties broken by
/// book id ascending so pages stay stable.
pub fn listing_order(sort: Option<&Sort<StockSortKey>>, a: &StockedBook, b: &StockedBook) -> Ordering {
    let primary = match sort {
        Some(s) => s.orient(s.key.compare(a, b)),
        None => Ordering::Equal,
    };
    primary.then_with(|| a.book.id.cmp(&b.book.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shelfkeep_catalog::{Genre, Isbn};
    use shelfkeep_core::BookId;

    fn row(title: &str, quantity: i64) -> StockedBook {
        StockedBook {
            book: BookRecord {
                id: BookId::new(),
                title: title.to_string(),
                author: "Anon".to_string(),
                genre: Genre::Fiction,
                isbn: Isbn::parse("9780306406157").unwrap(),
                publication_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            },
            quantity,
        }
    }

    #[test]
    fn sort_by_quantity_descending() {
        let mut rows = vec![row("a", 1), row("b", 9), row("c", 4)];
        let sort = Sort::desc(StockSortKey::Quantity);
        rows.sort_by(|a, b| listing_order(Some(&sort), a, b));
        let quantities: Vec<_> = rows.iter().map(|r| r.quantity).collect();
        assert_eq!(quantities, vec![9, 4, 1]);
    }

    #[test]
    fn ties_fall_back_to_book_id() {
        let mut rows = vec![row("same", 1), row("same", 1), row("same", 1)];
        let sort = Sort::asc(StockSortKey::Title);
        rows.sort_by(|a, b| listing_order(Some(&sort), a, b));
        assert!(rows.windows(2).all(|w| w[0].book.id <= w[1].book.id));
    }
}
