//! Offset/limit pagination value types.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Sort direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// An explicit sort over a key type `K` chosen by the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort<K> {
    pub key: K,
    pub direction: Direction,
}

impl<K> Sort<K> {
    pub fn asc(key: K) -> Self {
        Self {
            key,
            direction: Direction::Asc,
        }
    }

    pub fn desc(key: K) -> Self {
        Self {
            key,
            direction: Direction::Desc,
        }
    }

    /// Apply the direction to an ascending comparison result.
    pub fn orient(&self, ordering: core::cmp::Ordering) -> core::cmp::Ordering {
        match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// Zero-based page index + page size, with an optional sort.
///
/// Without a sort, results come back in the storage backend's default order.
///
/// Deserialization goes through [`PageRequest::new`], so a zero size is
/// rejected there too.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "PageRequestFields<K>",
    bound(deserialize = "K: Deserialize<'de>")
)]
pub struct PageRequest<K> {
    page: u32,
    size: u32,
    sort: Option<Sort<K>>,
}

#[derive(Deserialize)]
struct PageRequestFields<K> {
    page: u32,
    size: u32,
    sort: Option<Sort<K>>,
}

impl<K> TryFrom<PageRequestFields<K>> for PageRequest<K> {
    type Error = DomainError;

    fn try_from(fields: PageRequestFields<K>) -> DomainResult<Self> {
        let request = Self::new(fields.page, fields.size)?;
        Ok(match fields.sort {
            Some(sort) => request.sorted(sort),
            None => request,
        })
    }
}

impl<K> PageRequest<K> {
    /// Build a request. The page size must be at least 1.
    pub fn new(page: u32, size: u32) -> DomainResult<Self> {
        if size == 0 {
            return Err(DomainError::validation("page size must be at least 1"));
        }
        Ok(Self {
            page,
            size,
            sort: None,
        })
    }

    pub fn sorted(mut self, sort: Sort<K>) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Cap the page size (used to enforce a configured maximum).
    pub fn capped(mut self, max_size: u32) -> Self {
        self.size = self.size.min(max_size.max(1));
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sort(&self) -> Option<&Sort<K>> {
        self.sort.as_ref()
    }

    /// Number of rows skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Zero-based page index that was requested.
    pub page: u32,
    /// Page size that was applied.
    pub size: u32,
    /// Total number of matching rows across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Cut one page out of an already ordered, fully filtered result set.
    pub fn slice<K>(all: Vec<T>, request: &PageRequest<K>) -> Self {
        let total = all.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(offset)
            .take(request.size() as usize)
            .collect();
        Self {
            items,
            page: request.page(),
            size: request.size(),
            total,
        }
    }

    /// Whether rows exist beyond this page.
    pub fn has_more(&self) -> bool {
        (u64::from(self.page) + 1) * u64::from(self.size) < self.total
    }
}
