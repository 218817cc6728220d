//! Search projection over the collection
//!
//! Pure and synchronous: every call recomputes from its inputs.

use crate::models::Item;

/// Items whose title or description contains `term`, case-insensitively
///
/// A blank term yields every item. Order is preserved.
pub fn filter_items<'a>(items: &'a [Item], term: &str) -> Vec<&'a Item> {
    filter_indexed(items, term)
        .into_iter()
        .map(|(_, item)| item)
        .collect()
}

/// Like [`filter_items`], keeping each item's index in `items`
pub fn filter_indexed<'a>(items: &'a [Item], term: &str) -> Vec<(usize, &'a Item)> {
    if term.trim().is_empty() {
        return items.iter().enumerate().collect();
    }
    let needle = term.to_lowercase();
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.matches(&needle))
        .collect()
}

/// Current search term plus the projection it defines
#[derive(Debug, Clone, Default)]
pub struct QueryView {
    term: String,
}

impl QueryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_term(&mut self, term: impl Into<String>) {
        self.term = term.into();
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Project `items` through the current term
    ///
    /// Each match keeps its index in the unfiltered `items`.
    pub fn apply<'a>(&self, items: &'a [Item]) -> Vec<(usize, &'a Item)> {
        filter_indexed(items, &self.term)
    }
}
