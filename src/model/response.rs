/// A single page of a paginated listing.
#[derive(Debug, PartialEq, Eq)]
pub struct Page<T> {
    /// Retrieved items, in API order
    pub(crate) items: Vec<T>,

    /// The index of the next page, if the API reported one
    pub(crate) next_page: Option<u32>,
}

impl<T> Page<T> {
    /// Creates a new `Page` instance.
    pub fn new(items: Vec<T>, next_page: Option<u32>) -> Self {
        Self { items, next_page }
    }

    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}
