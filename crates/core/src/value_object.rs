//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**; they are defined entirely by their
/// attribute values and are immutable once built. The composite inventory key
/// `(book, location)` and a normalized ISBN are the value objects of this
/// domain.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Isbn(String);
///
/// impl ValueObject for Isbn {}
///
/// assert_eq!(Isbn("9780306406157".into()), Isbn("9780306406157".into()));
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
