//! Catalog domain module: books and physical locations.
//!
//! Records are plain data owned by the catalog registry; the inventory ledger
//! only reads them for identity checks and to pair books with quantities. The
//! filter factories here feed the predicate algebra in `shelfkeep_core`.

pub mod book;
pub mod isbn;
pub mod location;

pub use book::{
    BookCriterion, BookRecord, BookSortKey, Genre, NewBook, author_like, genre_is, isbn_is,
    published_between, title_like,
};
pub use isbn::{Isbn, IsbnKind};
pub use location::{
    LocationCriterion, LocationRecord, LocationSortKey, NewLocation, address_like, managed_by,
    name_like,
};

/// Case-insensitive substring test shared by the text criteria.
pub(crate) fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}
