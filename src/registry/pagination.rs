// src/registry/pagination.rs

//! Lazy page sequences for paginated registry listings
//!
//! A [`Pages`] iterator performs one blocking fetch per `next()` call and
//! yields that page's entries. The fetch closure decides where the
//! sequence ends by returning a page without a continuation cursor, so the
//! termination rule lives with the adapter that knows its registry.
//! Building a new [`Pages`] from the first cursor restarts the listing.

use crate::error::RegistryError;

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<C, T = String> {
    pub entries: Vec<T>,
    /// Cursor for the following page; `None` ends the sequence
    pub next: Option<C>,
}

impl<C, T> Page<C, T> {
    pub fn last(entries: Vec<T>) -> Self {
        Self {
            entries,
            next: None,
        }
    }
}

/// Iterator over pages, fetched on demand
pub struct Pages<C, T, F>
where
    F: FnMut(&C) -> Result<Page<C, T>, RegistryError>,
{
    cursor: Option<C>,
    fetch: F,
}

impl<C, T, F> Pages<C, T, F>
where
    F: FnMut(&C) -> Result<Page<C, T>, RegistryError>,
{
    pub fn new(first: C, fetch: F) -> Self {
        Self {
            cursor: Some(first),
            fetch,
        }
    }

    /// Drain every page, concatenating entries in page order
    pub fn collect_entries(self) -> Result<Vec<T>, RegistryError> {
        let mut entries = Vec::new();
        for page in self {
            entries.extend(page?);
        }
        Ok(entries)
    }
}

impl<C, T, F> Iterator for Pages<C, T, F>
where
    F: FnMut(&C) -> Result<Page<C, T>, RegistryError>,
{
    type Item = Result<Vec<T>, RegistryError>;

    fn next(&mut self) -> Option<Self::Item> {
        // An error leaves the cursor empty, ending the sequence
        let cursor = self.cursor.take()?;
        match (self.fetch)(&cursor) {
            Ok(page) => {
                self.cursor = page.next;
                Some(Ok(page.entries))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
