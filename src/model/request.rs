use std::fmt::Display;

use serde::Serialize;

/// The largest page size accepted by the hosting API.
pub const MAX_PER_PAGE: u8 = 100;

/// A page of a paginated listing, serialized as query parameters.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, Hash)]
pub struct PageRequest {
    /// The 1-based index of the page.
    pub(crate) page: u32,

    /// The number of items per page.
    pub(crate) per_page: u8,
}

impl PageRequest {
    /// Creates a new `PageRequest` with the given page index and size.
    pub fn new(page: u32, per_page: u8) -> Self {
        Self { page, per_page }
    }

    /// The first page with the given page size.
    pub fn first(per_page: u8) -> Self {
        Self::new(1, per_page)
    }

    /// The same listing at another page index.
    pub fn at(&self, page: u32) -> Self {
        Self::new(page, self.per_page)
    }

    /// Retrieves the page index.
    pub fn page(&self) -> u32 {
        self.page
    }
}

impl Display for PageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PageRequest: page={}, per_page={}", self.page, self.per_page)
    }
}
