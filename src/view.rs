//! List-view state and the derived projection shown to the user.
//!
//! `ListView` is the whole mutable state of one table: its filters and its
//! page position. Every change goes through a method here and the visible
//! rows are recomputed with [`ListView::derive`].

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::filter::{FilterError, FilterKey, FilterState};
use crate::model::Listable;
use crate::paginate::{Page, Paginator};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ListView {
    pub filter: FilterState,
    pub paginator: Paginator,
}

impl ListView {
    pub fn new(filter: FilterState, paginator: Paginator) -> Self {
        Self { filter, paginator }
    }

    pub fn set_filter(&mut self, key: FilterKey, value: impl Into<String>) {
        self.filter.set(key, value);
    }

    pub fn set_page(&mut self, page_index: usize) {
        self.paginator.set_page(page_index);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.paginator.set_page_size(page_size);
    }

    /// Filters `records`, pulls the page index back inside the result and
    /// returns the projection.
    pub fn derive<'a, R: Listable>(&mut self, records: &'a [R]) -> Result<DerivedView<'a, R>, FilterError> {
        let predicates = self.filter.compile()?;
        let filtered = predicates.apply(records);
        self.paginator.clamp_to(filtered.len());
        let window = self.paginator.window(filtered.len());
        Ok(DerivedView {
            filtered,
            window,
            paginator: self.paginator,
        })
    }
}

/// Filtered rows of a store plus the window of the current page.
#[derive(Debug)]
pub struct DerivedView<'a, R> {
    filtered: Vec<&'a R>,
    window: Range<usize>,
    paginator: Paginator,
}

impl<'a, R> DerivedView<'a, R> {
    pub fn filtered(&self) -> &[&'a R] {
        &self.filtered
    }

    pub fn total(&self) -> usize {
        self.filtered.len()
    }

    pub fn visible(&self) -> &[&'a R] {
        &self.filtered[self.window.clone()]
    }

    pub fn page_index(&self) -> usize {
        self.paginator.page_index()
    }

    pub fn page_count(&self) -> usize {
        self.paginator.page_count(self.filtered.len())
    }

    pub fn into_page(self) -> Page<R>
    where
        R: Clone,
    {
        let items = self.visible().iter().map(|r| (*r).clone()).collect();
        Page::new(items, self.filtered.len(), &self.paginator)
    }
}
