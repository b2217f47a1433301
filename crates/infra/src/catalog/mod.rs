//! Catalog gateway: books and locations.
//!
//! The inventory ledger uses this boundary for existence checks and to look up
//! the genre/author tags of a book when reporting stock movements.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryCatalog;
pub use postgres::PostgresCatalog;
pub use r#trait::CatalogRegistry;
