//! Optimistic concurrency tokens.

/// Optimistic concurrency expectation for a persisted record.
///
/// Stored records carry a version that starts at 1 on first insert and grows by
/// one per committed write. A record that was never persisted is at version 0.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The key must not be stored yet (insert only).
    Absent,
    /// The stored record must be at exactly this version. `Exact(0)` never
    /// matches.
    Exact(u64),
}

impl ExpectedVersion {
    /// The expectation for a record last read at `version`.
    pub fn of(version: u64) -> Self {
        if version == 0 {
            ExpectedVersion::Absent
        } else {
            ExpectedVersion::Exact(version)
        }
    }

    /// Whether a stored version of `actual` (0 = absent) satisfies this
    /// expectation.
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Absent => actual == 0,
            ExpectedVersion::Exact(v) => v != 0 && v == actual,
        }
    }
}
