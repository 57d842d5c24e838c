//! Paging containers

use serde::{Deserialize, Serialize};

use crate::services::pagination::{page_window, total_pages};

/// Neighbours shown on each side of the current page
pub const PAGE_WINDOW_SIBLINGS: u32 = 1;

/// Largest accepted page size
pub const MAX_PAGE_SIZE: u32 = 100;

/// 1-indexed page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub page_size: u32,
}

impl PageParams {
    /// Clamps to page >= 1 and 1 <= page_size <= MAX_PAGE_SIZE
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(1, 12)
    }
}

/// Entry of the pagination bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PageItem {
    Page { number: u32, current: bool },
    Ellipsis,
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
    /// Pagination bar for `page`
    pub pages: Vec<PageItem>,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        let total_pages = total_pages(total.max(0) as u64, params.page_size);
        Self {
            items,
            total,
            page: params.page,
            page_size: params.page_size,
            total_pages,
            pages: page_window(params.page, total_pages, PAGE_WINDOW_SIBLINGS),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            pages: self.pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}
