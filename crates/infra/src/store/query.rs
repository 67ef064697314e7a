//! Paging for searches and history queries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest page any query returns.
pub const MAX_PAGE: u32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PagingError {
    #[error("page_start must be at least 1, got {0}")]
    PageStart(i64),

    #[error("page_count must be between 1 and {MAX_PAGE}, got {0}")]
    PageCount(i64),
}

/// 1-based page window used by catalog and account search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_start: u32,
    pub page_count: u32,
}

impl PageRequest {
    pub fn new(page_start: i64, page_count: i64) -> Result<Self, PagingError> {
        if page_start < 1 || page_start > i64::from(u32::MAX) {
            return Err(PagingError::PageStart(page_start));
        }
        if !(1..=i64::from(MAX_PAGE)).contains(&page_count) {
            return Err(PagingError::PageCount(page_count));
        }
        Ok(Self {
            page_start: page_start as u32,
            page_count: page_count as u32,
        })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page_start - 1) * u64::from(self.page_count)
    }

    pub fn limit(&self) -> u32 {
        self.page_count
    }
}

/// Limit/offset window for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(20).clamp(1, MAX_PAGE),
            offset: offset.unwrap_or(0),
        }
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Cut one window out of an already filtered and ordered result set.
    pub fn slice(all: Vec<T>, offset: u64, limit: u32) -> Self {
        let count = all.len() as u64;
        let items = all
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();
        Self { count, items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_bounds() {
        assert_eq!(PageRequest::new(0, 10), Err(PagingError::PageStart(0)));
        assert_eq!(PageRequest::new(1, 0), Err(PagingError::PageCount(0)));
        assert_eq!(PageRequest::new(1, 101), Err(PagingError::PageCount(101)));

        let p = PageRequest::new(3, 10).unwrap();
        assert_eq!(p.offset(), 20);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn pagination_is_capped() {
        let p = Pagination::new(Some(5000), None);
        assert_eq!(p.limit, MAX_PAGE);
        assert_eq!(Pagination::new(Some(0), Some(4)).limit, 1);
    }

    #[test]
    fn slice_keeps_total_count() {
        let page = Page::slice((1..=7).collect::<Vec<_>>(), 5, 10);
        assert_eq!(page.count, 7);
        assert_eq!(page.items, vec![6, 7]);
    }
}
