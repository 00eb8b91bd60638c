//! Page division - splitting an ordered result set into fixed-size pages.
//!
//! A requested page number never produces an error. Missing, non-numeric
//! or non-positive values resolve to the first page, numbers past the end
//! resolve to the last page. An empty result set still has one page.

use serde::Serialize;

/// Posts shown per feed page.
pub const POSTS_PER_PAGE: u64 = 10;

/// A resolved page position inside a result set of `count` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
}

impl PageWindow {
    /// Resolve the raw `page` query parameter against `count` records.
    pub fn resolve(count: u64, per_page: u64, requested: Option<&str>) -> Self {
        let per_page = per_page.max(1);
        let num_pages = count.div_ceil(per_page).max(1);

        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if n > num_pages as i64 => num_pages,
            Some(Ok(n)) if n >= 1 => n as u64,
            _ => 1,
        };

        Self {
            number,
            num_pages,
            count,
            per_page,
        }
    }

    /// Number of records skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

/// One page of records plus the metadata the paginator template needs.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
    pub page_range: Vec<u64>,
}

impl<T> Page<T> {
    /// Wrap records already sliced to `window`.
    pub fn new(object_list: Vec<T>, window: PageWindow) -> Self {
        let has_previous = window.number > 1;
        let has_next = window.number < window.num_pages;

        Self {
            object_list,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            has_previous,
            has_next,
            previous_page_number: has_previous.then(|| window.number - 1),
            next_page_number: has_next.then(|| window.number + 1),
            page_range: (1..=window.num_pages).collect(),
        }
    }

    /// Divide a complete, already ordered sequence and keep the requested page.
    pub fn divide(records: Vec<T>, requested: Option<&str>, per_page: u64) -> Self {
        let window = PageWindow::resolve(records.len() as u64, per_page, requested);
        let object_list = records
            .into_iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .collect();

        Self::new(object_list, window)
    }

    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }
}
