use serde::{Deserialize, Serialize};

use shelfkeep_core::{BookId, DomainError, DomainResult, Entity, LocationId, ValueObject};

/// Composite identity of an inventory entry: one book at one location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryKey {
    pub book_id: BookId,
    pub location_id: LocationId,
}

impl ValueObject for InventoryKey {}

impl InventoryKey {
    pub fn new(book_id: BookId, location_id: LocationId) -> Self {
        Self {
            book_id,
            location_id,
        }
    }
}

impl core::fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "book {} @ location {}", self.book_id, self.location_id)
    }
}

/// What to do with a zero delta against a key that has no entry yet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroDeltaPolicy {
    /// Create the entry at quantity 0 (the entry becomes observable).
    #[default]
    Materialize,
    /// Leave the key absent and write nothing.
    Skip,
}

impl core::str::FromStr for ZeroDeltaPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "materialize" => Ok(ZeroDeltaPolicy::Materialize),
            "skip" => Ok(ZeroDeltaPolicy::Skip),
            other => Err(DomainError::validation(format!(
                "unknown zero-delta policy '{other}' (expected 'materialize' or 'skip')"
            ))),
        }
    }
}

/// Direction and magnitude of a committed stock change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockMovement {
    Restocked(u64),
    Sold(u64),
}

/// A validated change to one entry, decided but not yet applied.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub key: InventoryKey,
    pub previous: i64,
    pub delta: i64,
    pub quantity: i64,
}

impl Adjustment {
    /// `None` for a zero delta.
    pub fn movement(&self) -> Option<StockMovement> {
        match self.delta {
            0 => None,
            d if d > 0 => Some(StockMovement::Restocked(d.unsigned_abs())),
            d => Some(StockMovement::Sold(d.unsigned_abs())),
        }
    }
}

/// Live quantity counter for one (book, location) pair.
///
/// `quantity >= 0` holds for every value of this type. `version` is the
/// optimistic concurrency token of the stored row; 0 means the entry has been
/// materialized in memory but never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    key: InventoryKey,
    quantity: i64,
    version: u64,
}

impl Entity for InventoryEntry {
    type Id = InventoryKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

impl InventoryEntry {
    /// A fresh, not-yet-persisted entry at quantity 0.
    pub fn materialize(key: InventoryKey) -> Self {
        Self {
            key,
            quantity: 0,
            version: 0,
        }
    }

    /// Rebuild an entry from storage.
    pub fn restore(key: InventoryKey, quantity: i64, version: u64) -> DomainResult<Self> {
        if quantity < 0 {
            return Err(DomainError::validation(format!(
                "stored quantity for {key} is negative ({quantity})"
            )));
        }
        Ok(Self {
            key,
            quantity,
            version,
        })
    }

    pub fn key(&self) -> InventoryKey {
        self.key
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }

    /// Decide whether `delta` may be applied. Does not mutate.
    ///
    /// Fails with `InsufficientStock { available, requested: -delta }` when the
    /// result would be negative.
    pub fn decide(&self, delta: i64) -> DomainResult<Adjustment> {
        let quantity = self.quantity.checked_add(delta).ok_or_else(|| {
            DomainError::validation(format!("adjusting {} by {delta} overflows", self.key))
        })?;

        if quantity < 0 {
            let requested = delta.checked_neg().ok_or_else(|| {
                DomainError::validation(format!("delta {delta} is out of range"))
            })?;
            return Err(DomainError::insufficient_stock(self.quantity, requested));
        }

        Ok(Adjustment {
            key: self.key,
            previous: self.quantity,
            delta,
            quantity,
        })
    }

    /// Apply a decided adjustment. Only adjustments decided against the
    /// current state are accepted.
    pub fn apply(&mut self, adjustment: &Adjustment) -> DomainResult<()> {
        if adjustment.key != self.key {
            return Err(DomainError::validation("adjustment targets a different key"));
        }
        if adjustment.previous != self.quantity {
            return Err(DomainError::conflict(format!(
                "adjustment was decided against quantity {}, entry holds {}",
                adjustment.previous, self.quantity
            )));
        }
        self.quantity = adjustment.quantity;
        Ok(())
    }

    /// The entry as stored after a committed write at `version`.
    pub fn committed(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> InventoryKey {
        InventoryKey::new(BookId::new(), LocationId::new())
    }

    fn entry_with(quantity: i64) -> InventoryEntry {
        InventoryEntry::restore(test_key(), quantity, 1).unwrap()
    }

    #[test]
    fn materialized_entry_starts_empty_and_unpersisted() {
        let entry = InventoryEntry::materialize(test_key());
        assert_eq!(entry.quantity(), 0);
        assert!(!entry.is_persisted());
    }

    #[test]
    fn restock_then_sell() {
        let mut entry = InventoryEntry::materialize(test_key());
        let adj = entry.decide(5).unwrap();
        entry.apply(&adj).unwrap();
        assert_eq!(entry.quantity(), 5);
        assert_eq!(adj.movement(), Some(StockMovement::Restocked(5)));

        let adj = entry.decide(-3).unwrap();
        entry.apply(&adj).unwrap();
        assert_eq!(entry.quantity(), 2);
        assert_eq!(adj.movement(), Some(StockMovement::Sold(3)));
    }

    #[test]
    fn overselling_reports_available_and_requested() {
        let entry = entry_with(2);
        let err = entry.decide(-5).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(2, 5));
        assert_eq!(entry.quantity(), 2);
    }

    #[test]
    fn selling_down_to_zero_is_allowed() {
        let entry = entry_with(4);
        assert_eq!(entry.decide(-4).unwrap().quantity, 0);
    }

    #[test]
    fn zero_delta_has_no_movement() {
        let entry = entry_with(3);
        let adj = entry.decide(0).unwrap();
        assert_eq!(adj.quantity, 3);
        assert_eq!(adj.movement(), None);
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let entry = entry_with(i64::MAX);
        assert!(matches!(entry.decide(1), Err(DomainError::Validation(_))));
    }

    #[test]
    fn most_negative_delta_is_insufficient_not_a_panic() {
        let entry = entry_with(0);
        // -i64::MIN is not representable, so only the most negative delta is rejected as invalid.
        let result = entry.decide(i64::MIN + 1);
        assert_eq!(result.unwrap_err(), DomainError::insufficient_stock(0, i64::MAX));
        assert!(matches!(entry.decide(i64::MIN), Err(DomainError::Validation(_))));
    }

    #[test]
    fn restore_rejects_negative_quantities() {
        assert!(InventoryEntry::restore(test_key(), -1, 1).is_err());
    }

    #[test]
    fn stale_adjustment_is_rejected() {
        let mut entry = entry_with(5);
        let adj = entry.decide(-3).unwrap();
        entry.apply(&adj).unwrap();
        assert!(matches!(entry.apply(&adj), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn zero_delta_policy_parses() {
        assert_eq!("Skip".parse::<ZeroDeltaPolicy>().unwrap(), ZeroDeltaPolicy::Skip);
        assert_eq!(
            " materialize ".parse::<ZeroDeltaPolicy>().unwrap(),
            ZeroDeltaPolicy::Materialize
        );
        assert!("ignore".parse::<ZeroDeltaPolicy>().is_err());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: the quantity never goes negative and equals the sum of accepted deltas.
            #[test]
            fn accepted_deltas_are_conserved(
                start in 0i64..50,
                deltas in prop::collection::vec(-20i64..20, 0..40)
            ) {
                let mut entry = InventoryEntry::restore(test_key(), start, 1).unwrap();
                let mut expected = start;

                for delta in deltas {
                    let before = entry.quantity();
                    match entry.decide(delta) {
                        Ok(adj) => {
                            entry.apply(&adj).unwrap();
                            expected += delta;
                        }
                        Err(DomainError::InsufficientStock { available, requested }) => {
                            prop_assert!(before + delta < 0);
                            prop_assert_eq!(available, before);
                            prop_assert_eq!(requested, -delta);
                            prop_assert_eq!(entry.quantity(), before);
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                    }
                    prop_assert!(entry.quantity() >= 0);
                    prop_assert_eq!(entry.quantity(), expected);
                }
            }

            /// Property: decide() never mutates.
            #[test]
            fn decide_is_pure(start in 0i64..100, delta in -200i64..200) {
                let entry = InventoryEntry::restore(test_key(), start, 7).unwrap();
                let before = entry.clone();
                let _ = entry.decide(delta);
                prop_assert_eq!(entry, before);
            }
        }
    }
}
