//! Page-based pagination.
//!
//! A [`PageRequest`] is validated once at the edge; storage code can then
//! rely on `page >= 1` and `1 <= limit <= MAX_LIMIT`. A [`Page`] carries the
//! derived navigation flags so every listing reports them the same way.

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`PageRequest`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    /// Pages are 1-based.
    #[error("page must be at least 1")]
    PageOutOfRange,
    /// Limit must be positive and bounded.
    #[error("limit must be between 1 and {max}")]
    LimitOutOfRange {
        /// Largest accepted limit.
        max: u32,
    },
}

/// A validated page/limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Page used when the client does not ask for one.
    pub const DEFAULT_PAGE: u32 = 1;
    /// Limit used when the client does not ask for one.
    pub const DEFAULT_LIMIT: u32 = 20;
    /// Upper bound on `limit`.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page request.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError`] if `page` is 0 or `limit` is outside
    /// `1..=MAX_LIMIT`.
    pub const fn new(page: u32, limit: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::PageOutOfRange);
        }
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(PaginationError::LimitOutOfRange {
                max: Self::MAX_LIMIT,
            });
        }
        Ok(Self { page, limit })
    }

    /// Build a page request from optional query parameters, applying defaults.
    ///
    /// # Errors
    ///
    /// Same as [`PageRequest::new`].
    pub fn from_query(page: Option<u32>, limit: Option<u32>) -> Result<Self, PaginationError> {
        Self::new(
            page.unwrap_or(Self::DEFAULT_PAGE),
            limit.unwrap_or(Self::DEFAULT_LIMIT),
        )
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Assemble a page from the rows fetched for `request` and the total
    /// number of matching rows.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let total_pages = total.div_ceil(u64::from(request.limit));
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            total_pages,
            has_next: u64::from(request.page) < total_pages,
            has_prev: request.page > 1,
        }
    }

    /// Convert the items while keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_rejects_zero_page() {
        assert_eq!(
            PageRequest::new(0, 10),
            Err(PaginationError::PageOutOfRange)
        );
    }

    #[test]
    fn test_page_request_rejects_bad_limit() {
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, PageRequest::MAX_LIMIT + 1).is_err());
        assert!(PageRequest::new(1, PageRequest::MAX_LIMIT).is_ok());
    }

    #[test]
    fn test_from_query_defaults() {
        let req = PageRequest::from_query(None, None).unwrap();
        assert_eq!(req, PageRequest::default());
        assert_eq!(req.page(), 1);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(1, 20).unwrap().offset(), 0);
        assert_eq!(PageRequest::new(3, 20).unwrap().offset(), 40);
    }

    #[test]
    fn test_navigation_flags_hold_for_all_small_inputs() {
        for total in 0..40_u64 {
            for limit in 1..8_u32 {
                for page in 1..10_u32 {
                    let req = PageRequest::new(page, limit).unwrap();
                    let p: Page<()> = Page::new(Vec::new(), total, req);
                    let pages = total.div_ceil(u64::from(limit));
                    assert_eq!(p.total_pages, pages);
                    assert_eq!(p.has_next, u64::from(page) < pages);
                    assert_eq!(p.has_prev, page > 1);
                }
            }
        }
    }

    #[test]
    fn test_empty_result_has_no_pages() {
        let p: Page<u8> = Page::new(Vec::new(), 0, PageRequest::default());
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_prev);
    }

    #[test]
    fn test_serializes_camel_case() {
        let p = Page::new(vec![1, 2], 5, PageRequest::new(1, 2).unwrap());
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["hasNext"], true);
        assert_eq!(json["hasPrev"], false);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let p = Page::new(vec![1, 2], 5, PageRequest::new(2, 2).unwrap());
        let mapped = p.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.page, 2);
        assert!(mapped.has_next);
        assert!(mapped.has_prev);
    }
}
