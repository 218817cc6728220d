//! Content source abstraction
//!
//! A [`ContentSource`] turns a page request into a batch of items plus the
//! upstream's total-count signal. The sync engine only ever talks to this
//! trait; transport, response schema and placeholder defaults for missing
//! fields are the source's business.
//!
//! Implementations:
//! - [`NewsApiSource`] - paged JSON headlines over HTTP

mod newsapi;

pub use newsapi::NewsApiSource;

use std::future::Future;

use thiserror::Error;

use crate::models::Item;

/// One page of upstream results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Items in upstream order
    pub items: Vec<Item>,
    /// Total number of results the upstream claims to hold
    pub total_results: u64,
}

impl Page {
    pub fn new(items: Vec<Item>, total_results: u64) -> Self {
        Self {
            items,
            total_results,
        }
    }
}

/// Errors returned by a content source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Request could not be sent or timed out
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Upstream reported an error in its payload
    #[error("API error: {0}")]
    Api(String),

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Source is misconfigured (bad URL, missing credentials)
    #[error("Source configuration error: {0}")]
    Config(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Paged provider of items
///
/// `page` is 1-based and `page_size` is positive. Timeouts belong to the
/// implementation's transport and surface as ordinary errors.
pub trait ContentSource: Send + Sync {
    /// Fetch one page of items
    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = SourceResult<Page>> + Send;
}
