use serde::{Deserialize, Serialize};

/// Pagination state attached to a [`QueryBuilder`](crate::QueryBuilder).
///
/// `page` is 0-based. The total row count is learned once, by the builder's
/// `COUNT(*)` pre-query, and cached here for every later stringification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pager {
    pub page: u64,
    pub per_page: u64,
    #[serde(default)]
    pub total: Option<u64>,
}

impl Default for Pager {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: 20,
            total: None,
        }
    }
}

impl Pager {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page,
            per_page,
            total: None,
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = Some(total);
    }

    /// Number of pages, `None` until the total is known.
    pub fn total_pages(&self) -> Option<u64> {
        let total = self.total?;
        if self.per_page == 0 {
            return Some(0);
        }
        Some(total.div_ceil(self.per_page))
    }

    /// Requested page, clamped to the last page once the total is known.
    pub fn current_page(&self) -> u64 {
        match self.total_pages() {
            Some(0) => 0,
            Some(pages) => self.page.min(pages - 1),
            None => self.page,
        }
    }

    pub fn offset(&self) -> u64 {
        self.current_page() * self.per_page
    }

    /// Trailing ` LIMIT n OFFSET m` clause of the paged statement.
    pub fn limit_sql(&self) -> String {
        if self.offset() == 0 {
            format!(" LIMIT {}", self.per_page)
        } else {
            format!(" LIMIT {} OFFSET {}", self.per_page, self.offset())
        }
    }

    /// Wrap one page of results with its pagination metadata.
    pub fn page_of<T>(&self, content: Vec<T>) -> Page<T> {
        Page {
            content,
            page: self.current_page(),
            size: self.per_page,
            total_elements: self.total.unwrap_or_default(),
            total_pages: self.total_pages().unwrap_or_default(),
        }
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}
