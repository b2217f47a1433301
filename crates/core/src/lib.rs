//! `shelfkeep-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, optimistic-concurrency versions,
//! pagination value types and the optional-predicate algebra used by search
//! filters.

pub mod entity;
pub mod error;
pub mod id;
pub mod page;
pub mod predicate;
pub mod value_object;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, Resource};
pub use id::{BookId, LocationId, UserId};
pub use page::{Direction, Page, PageRequest, Sort};
pub use predicate::{Criterion, Filter, Predicate};
pub use value_object::ValueObject;
pub use version::ExpectedVersion;
