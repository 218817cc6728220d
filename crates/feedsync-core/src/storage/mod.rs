//! Storage layer
//!
//! Durable key/value storage for the cached collection and the annotation
//! sets.
//!
//! ## Architecture
//!
//! - **PersistentStore**: blob get/set by key (`FileStore`, `MemoryStore`)
//! - **WriteQueue**: ordered background writer so callers never wait on disk
//!
//! Corrupt or unreadable data is treated as absent, never as fatal.

pub mod error;
pub mod persistence;
pub mod writer;

pub use error::{StorageError, StorageResult};
pub use persistence::{read_json, FileStore, MemoryStore, PersistentStore};
pub use writer::WriteQueue;

/// Key holding the cached collection and cursor
pub const ARTICLES_KEY: &str = "articles";
/// Key holding liked item ids
pub const LIKED_KEY: &str = "liked";
/// Key holding bookmarked item ids
pub const BOOKMARKED_KEY: &str = "bookmarked";
