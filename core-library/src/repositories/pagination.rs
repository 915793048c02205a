//! Offset pagination for list queries

use serde::{Deserialize, Serialize};

/// Largest page a caller may ask for.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Zero-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    ///
    /// ```
    /// use core_library::repositories::PageRequest;
    ///
    /// let request = PageRequest::new(2, 20);
    /// assert_eq!(request.offset(), 40);
    /// assert_eq!(PageRequest::new(0, 0).page_size, 1);
    /// ```
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn first(page_size: u32) -> Self {
        Self::new(0, page_size)
    }

    /// The request for the following page.
    pub fn next(&self) -> Self {
        Self::new(self.page.saturating_add(1), self.page_size)
    }

    /// SQL `OFFSET`
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }

    /// SQL `LIMIT`
    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(50)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Items across all pages
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let total_pages = total.div_ceil(u64::from(request.page_size.max(1)));

        Self {
            items,
            total,
            page: request.page,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            page_size: request.page_size,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps_size() {
        assert_eq!(PageRequest::new(0, 0).page_size, 1);
        assert_eq!(PageRequest::new(0, 10_000).page_size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::default().page_size, 50);
    }

    #[test]
    fn test_next_page() {
        let request = PageRequest::first(20).next().next();
        assert_eq!(request.page, 2);
        assert_eq!(request.offset(), 40);
        assert_eq!(request.limit(), 20);
    }

    #[test]
    fn test_page_counts() {
        let page = Page::new(vec![1, 2, 3], 25, PageRequest::new(0, 10));
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
        assert!(!page.has_previous());

        let last = Page::new(vec![1], 25, PageRequest::new(2, 10));
        assert!(!last.has_next());
        assert!(last.has_previous());

        let empty = Page::<u8>::new(Vec::new(), 0, PageRequest::default());
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next());
    }

    #[test]
    fn test_page_map() {
        let page = Page::new(vec![1, 2, 3], 3, PageRequest::new(0, 10)).map(|x| x * 2);
        assert_eq!(page.items, vec![2, 4, 6]);
        assert_eq!(page.total, 3);
    }
}
