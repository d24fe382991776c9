//! Page/offset pagination primitives shared by list endpoints.
//!
//! A [`PageRequest`] is always valid: raw query values are clamped rather
//! than rejected, so list handlers never fail on paging input.

use serde::{Deserialize, Serialize};

/// Page size used when the client does not send one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page size served.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Clamped page/size pair.
///
/// ## Invariants
/// - `page >= 1`
/// - `1 <= size <= MAX_PAGE_SIZE`
///
/// # Examples
/// ```
/// use pagination::PageRequest;
///
/// let request = PageRequest::clamped(Some(0), Some(500));
/// assert_eq!(request.page(), 1);
/// assert_eq!(request.size(), 100);
/// assert_eq!(request.offset(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Clamp raw query values into a valid request.
    #[must_use]
    pub fn clamped(page: Option<i64>, size: Option<i64>) -> Self {
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
        let size = size
            .unwrap_or(i64::from(DEFAULT_PAGE_SIZE))
            .clamp(1, i64::from(MAX_PAGE_SIZE));
        Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            size: u32::try_from(size).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.size)
    }

    /// Row limit as a signed SQL value.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

/// One page of results with the total row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Rows on this page.
    pub data: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Rows matching the filters across all pages.
    pub total: i64,
}

impl<T> Paginated<T> {
    /// Wrap a page of rows.
    #[must_use]
    pub fn new(data: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            data,
            page: request.page,
            page_size: request.size,
            total,
        }
    }

    /// Convert every row, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
        }
    }
}
