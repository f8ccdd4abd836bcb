//! Page-number pagination.
//!
//! Page numbers are 1-based. A feed always has at least one page, and
//! requests for pages past either end land on the nearest existing page.

use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Posts per page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// A requested page of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_size: u64,
    page_number: u64,
}

impl PageRequest {
    /// Build a request. `page_size` must be positive; `page_number` below 1
    /// is raised to 1.
    pub fn new(page_size: u64, page_number: u64) -> AppResult<Self> {
        if page_size == 0 {
            return Err(AppError::BadRequest(
                "page size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            page_size,
            page_number: page_number.max(1),
        })
    }

    /// Build a request from the raw `?page=` query value.
    ///
    /// Missing, blank, non-numeric and non-positive values all mean page 1.
    /// A number too large to represent saturates, so it clamps to the last
    /// page like any other page past the end.
    pub fn from_query(page_size: u64, raw: Option<&str>) -> AppResult<Self> {
        let number = raw
            .map(str::trim)
            .and_then(|s| match s.parse::<u64>() {
                Ok(n) => Some(n),
                Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(u64::MAX),
                Err(_) => None,
            })
            .filter(|n| *n >= 1)
            .unwrap_or(1);

        Self::new(page_size, number)
    }

    /// First page of the given size.
    pub fn first(page_size: u64) -> AppResult<Self> {
        Self::new(page_size, 1)
    }

    /// Maximum number of items per page.
    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Requested 1-based page number, before clamping.
    #[must_use]
    pub const fn page_number(&self) -> u64 {
        self.page_number
    }

    /// Number of pages needed for `total_items`. Never less than one.
    #[must_use]
    pub const fn total_pages(&self, total_items: u64) -> u64 {
        if total_items == 0 {
            1
        } else {
            total_items.div_ceil(self.page_size)
        }
    }

    /// The page actually served once `total_items` is known.
    #[must_use]
    pub fn clamped_number(&self, total_items: u64) -> u64 {
        self.page_number.clamp(1, self.total_pages(total_items))
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page, at most `page_size`.
    pub items: Vec<T>,
    /// 1-based number of this page.
    pub number: u64,
    /// Page size used to cut the result set.
    pub page_size: u64,
    /// Items across all pages.
    pub total_items: u64,
    /// Page count, at least one.
    pub total_pages: u64,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Assemble a page from an already clamped number.
    #[must_use]
    pub fn new(items: Vec<T>, number: u64, page_size: u64, total_items: u64) -> Self {
        let total_pages = if total_items == 0 || page_size == 0 {
            1
        } else {
            total_items.div_ceil(page_size)
        };

        Self {
            items,
            number,
            page_size,
            total_items,
            total_pages,
            has_next: number < total_pages,
            has_prev: number > 1,
        }
    }

    /// The single empty page of an empty result set.
    #[must_use]
    pub fn empty(page_size: u64) -> Self {
        Self::new(Vec::new(), 1, page_size, 0)
    }

    /// Transform every item while keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }

    /// Number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
