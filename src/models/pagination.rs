//! Offset pagination shared by list endpoints

use serde::{Deserialize, Serialize};

/// Largest page size any list endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamped to sane bounds
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_next: bool,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        let total_pages = page_count(total, params.page_size);
        Self {
            items,
            total,
            page: params.page,
            page_size: params.page_size,
            total_pages,
            has_next: params.page < total_pages,
        }
    }

    /// Transform every item, keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_next: self.has_next,
        }
    }
}

fn page_count(total: i64, page_size: u32) -> u32 {
    if page_size == 0 || total <= 0 {
        return 0;
    }
    (total as u64).div_ceil(u64::from(page_size)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_clamp() {
        let params = ListParams::new(0, 1000);
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, MAX_PAGE_SIZE);
        assert_eq!(ListParams::new(3, 0).page_size, 1);
    }

    #[test]
    fn test_offset() {
        assert_eq!(ListParams::new(1, 20).offset(), 0);
        assert_eq!(ListParams::new(3, 20).offset(), 40);
    }

    #[test]
    fn test_total_pages_and_has_next() {
        let params = ListParams::new(1, 10);
        let empty = PagedResult::<i32>::new(vec![], 0, &params);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        let full = PagedResult::<i32>::new(vec![], 10, &params);
        assert_eq!(full.total_pages, 1);
        assert!(!full.has_next);
        let result = PagedResult::<i32>::new(vec![], 11, &params);
        assert_eq!(result.total_pages, 2);
        assert!(result.has_next);
        assert!(!PagedResult::<i32>::new(vec![], 11, &ListParams::new(2, 10)).has_next);
    }

    #[test]
    fn test_paging_metadata_serialized() {
        let page = PagedResult::new(vec![1, 2], 5, &ListParams::new(1, 2)).map(|n| n * 10);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["items"], serde_json::json!([10, 20]));
        assert_eq!(json["total_pages"], 3);
        assert_eq!(json["has_next"], true);
    }
}
