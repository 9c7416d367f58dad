//! Page windows over a filtered sequence.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Page position of a list view. `page_index` is 0-based.
///
/// Deserialized values go through [`Paginator::with_limit`], so a stored
/// `page_size` of 0 comes back as 1.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(from = "PaginatorFields")]
pub struct Paginator {
    page_index: usize,
    page_size: usize,
    max_page_size: usize,
}

#[derive(Deserialize)]
struct PaginatorFields {
    page_index: usize,
    page_size: usize,
    max_page_size: usize,
}

impl From<PaginatorFields> for Paginator {
    fn from(fields: PaginatorFields) -> Self {
        let mut paginator = Paginator::with_limit(fields.page_size, fields.max_page_size);
        paginator.set_page(fields.page_index);
        paginator
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    /// `page_size` is clamped to `[1, MAX_PAGE_SIZE]`.
    pub fn new(page_size: usize) -> Self {
        Self::with_limit(page_size, MAX_PAGE_SIZE)
    }

    pub fn with_limit(page_size: usize, max_page_size: usize) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            page_index: 0,
            page_size: page_size.clamp(1, max_page_size),
            max_page_size,
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    /// Changing the page size always returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.clamp(1, self.max_page_size);
        self.page_index = 0;
    }

    /// `ceil(total / page_size)`; an empty sequence has no pages.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }

    /// Pulls the page index back onto the last page of `total` rows.
    pub fn clamp_to(&mut self, total: usize) {
        let last = self.page_count(total).saturating_sub(1);
        if self.page_index > last {
            self.page_index = last;
        }
    }

    /// Index window of the current page, clipped to `total`.
    pub fn window(&self, total: usize) -> Range<usize> {
        let start = self.page_index.saturating_mul(self.page_size).min(total);
        let end = start.saturating_add(self.page_size).min(total);
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.window(items.len())]
    }
}

/// One page of a list result plus its position metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Rows matching the filters, across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: usize, paginator: &Paginator) -> Self {
        Self {
            items,
            total,
            page: paginator.page_index(),
            page_size: paginator.page_size(),
            page_count: paginator.page_count(total),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next_page(&self) -> bool {
        self.page + 1 < self.page_count
    }

    pub fn has_previous_page(&self) -> bool {
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
            page_size: self.page_size,
            page_count: self.page_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(Paginator::new(0).page_size(), 1);
        assert_eq!(Paginator::new(500).page_size(), MAX_PAGE_SIZE);
        assert_eq!(Paginator::with_limit(50, 20).page_size(), 20);
    }

    #[test]
    fn test_page_count() {
        let p = Paginator::new(10);
        assert_eq!(p.page_count(0), 0);
        assert_eq!(p.page_count(5), 1);
        assert_eq!(p.page_count(10), 1);
        assert_eq!(p.page_count(11), 2);
        assert_eq!(p.page_count(101), 11);
    }

    #[test]
    fn test_window_and_last_page() {
        let items: Vec<u32> = (0..23).collect();
        let mut p = Paginator::new(10);
        assert_eq!(p.slice(&items), &items[0..10]);

        p.set_page(2);
        assert_eq!(p.slice(&items), &[20, 21, 22]);

        p.set_page(7);
        assert!(p.slice(&items).is_empty());
    }

    #[test]
    fn test_set_page_size_resets_index() {
        let mut p = Paginator::new(10);
        p.set_page(4);
        p.set_page_size(25);
        assert_eq!(p.page_index(), 0);
        assert_eq!(p.page_size(), 25);
    }

    #[test]
    fn test_clamp_to_shrunk_result() {
        let mut p = Paginator::new(10);
        p.set_page(5);
        p.clamp_to(12);
        assert_eq!(p.page_index(), 1);

        p.clamp_to(0);
        assert_eq!(p.page_index(), 0);
    }

    #[test]
    fn test_page_metadata() {
        let mut p = Paginator::new(5);
        p.set_page(2);
        let page = Page::new(vec![1, 2, 3], 13, &p);
        assert_eq!(page.page_count, 3);
        assert!(!page.has_next_page());
        assert!(page.has_previous_page());

        let doubled = page.map(|x| x * 2);
        assert_eq!(doubled.items, vec![2, 4, 6]);
        assert_eq!(doubled.total, 13);
    }

    #[test]
    fn test_deserialize_keeps_size_in_range() {
        let p: Paginator =
            serde_json::from_str(r#"{"page_index":2,"page_size":0,"max_page_size":100}"#).unwrap();
        assert_eq!(p.page_size(), 1);
        assert_eq!(p.page_index(), 2);
        assert_eq!(p.page_count(5), 5);

        let p: Paginator =
            serde_json::from_str(r#"{"page_index":0,"page_size":500,"max_page_size":0}"#).unwrap();
        assert_eq!(p.page_size(), 1);
    }
}
