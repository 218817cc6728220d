//! Data models for feedsync
//!
//! Defines the synchronized record (`Item`), the ordered working set
//! (`Collection`) and the paging cursor (`PageCursor`).
//!
//! Item identity is its `id`. Two items sharing an id are the same logical
//! item: later arrivals are dropped, never merged field by field.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One synchronized content record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Stable identifier (derived from the source's canonical unique field)
    pub id: String,
    /// Headline
    pub title: String,
    /// Short summary
    pub description: String,
    /// Optional lead image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Publication timestamp, if the source provided one
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Name of the outlet that published the item
    pub source_name: String,
    /// Body text (may be a truncated excerpt)
    #[serde(default)]
    pub body: String,
}

impl Item {
    /// Create an item with the given id and title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            image_url: None,
            published_at: None,
            source_name: String::new(),
            body: String::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the source name
    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    /// Check whether title or description contains an already-lowercased needle
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// Ordered, deduplicated working set of items
///
/// Insertion order is arrival order. No two items share an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Item>", into = "Vec<Item>")]
pub struct Collection {
    items: Vec<Item>,
    ids: HashSet<String>,
}

impl Collection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from items, keeping the first occurrence of each id
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut collection = Self::new();
        collection.append(items);
        collection
    }

    /// Append items whose ids are not already held, preserving their order
    ///
    /// Returns the number of items actually added.
    pub fn append(&mut self, batch: Vec<Item>) -> usize {
        let before = self.items.len();
        for item in batch {
            if self.ids.insert(item.id.clone()) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    /// Replace the whole collection with a new batch
    pub fn replace(&mut self, batch: Vec<Item>) {
        *self = Self::from_items(batch);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Get an item by id
    pub fn get(&self, id: &str) -> Option<&Item> {
        if !self.contains(id) {
            return None;
        }
        self.items.iter().find(|item| item.id == id)
    }

    /// All items in arrival order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// Item ids in arrival order
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.id.as_str()).collect()
    }
}

impl From<Vec<Item>> for Collection {
    fn from(items: Vec<Item>) -> Self {
        Self::from_items(items)
    }
}

impl From<Collection> for Vec<Item> {
    fn from(collection: Collection) -> Self {
        collection.items
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Paging position within the upstream source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    /// Next page to request (1-based)
    pub next_page: u32,
    /// No further pages exist upstream
    pub exhausted: bool,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            next_page: 1,
            exhausted: false,
        }
    }
}

impl PageCursor {
    /// Whether more pages may be requested
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }
}
