//! Document store trait.
//!
//! The engine only needs path-addressed reads and writes plus an atomic
//! counter. Paths are `/`-separated; the last segment of a record path is
//! its storage key and everything before it is the collection path.

use crate::Result;
use crate::models::Document;

/// Trait for stores that persist path-addressed JSON documents.
///
/// Implementations must provide read-your-own-write consistency per record:
/// a `get` after a `set`/`merge` on the same path observes that write.
pub trait DocumentStore {
    /// Fetch one record, or `None` when nothing is stored at `path`.
    fn get(&self, path: &str) -> Result<Option<Document>>;

    /// Fetch every record directly under a collection path, as
    /// `(storage key, record)` pairs in insertion order. Empty when the
    /// collection does not exist.
    fn list(&self, collection: &str) -> Result<Vec<(String, Document)>>;

    /// Replace the whole record at `path`.
    fn set(&mut self, path: &str, doc: &Document) -> Result<()>;

    /// Shallow-merge `patch` into the record at `path`, creating it if needed.
    /// Nested objects and arrays in the patch replace stored values wholesale.
    fn merge(&mut self, path: &str, patch: &Document) -> Result<()>;

    /// Atomically increment the counter `key` and return the new value.
    /// Counters start at zero, so the first call returns 1.
    fn increment(&mut self, key: &str) -> Result<u64>;

    /// Storage location description (for display purposes).
    fn location(&self) -> String;
}

/// Split a record path into `(collection, key)`.
pub fn split_path(path: &str) -> (String, String) {
    let trimmed = normalize_path(path);
    match trimmed.rsplit_once('/') {
        Some((parent, key)) => (parent.to_string(), key.to_string()),
        None => (String::new(), trimmed),
    }
}

/// Strip leading/trailing slashes and collapse empty segments.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
