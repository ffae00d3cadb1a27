//! Pagination and sorting requests, and the page of results they produce.

use serde::{Deserialize, Serialize};

/// Page size applied when a search is issued without an explicit page
/// request.
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort criterion over a single attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Zero-based page request with an optional sort.
///
/// When no sort is given, result order falls back to whatever the backing
/// engine considers relevance/insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_number: usize,
    pub page_size: usize,
    pub sort: Option<Sort>,
}

impl PageRequest {
    /// Build a page request. A `page_size` of zero is clamped to one; every
    /// page carries at least one slot.
    pub fn new(page_number: usize, page_size: usize) -> Self {
        Self {
            page_number,
            page_size: page_size.max(1),
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Offset of the first element of this page within the full result set.
    pub fn offset(&self) -> usize {
        self.page_number * self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results.
///
/// `total_elements` counts the full matching set, not just this page;
/// `content.len()` never exceeds `page_size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub page_number: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, total_elements: u64, request: &PageRequest) -> Self {
        Self {
            content,
            total_elements,
            page_number: request.page_number,
            page_size: request.page_size,
        }
    }

    pub fn empty(request: &PageRequest) -> Self {
        Self::new(Vec::new(), 0, request)
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Map the page content, keeping the paging envelope intact.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}
