//! Remote mirror of the local store.
//!
//! In cloud mode every write is mirrored to a relational database and reads
//! prefer it. The mirror works on camelCase JSON documents so that the
//! repository does not care how a backend lays out its rows.

mod memory;
mod postgres;
pub mod schema;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::Collection;

pub use memory::MemoryRemote;
pub use postgres::PgRemote;

/// A remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Check that the remote answers.
    async fn ping(&self) -> Result<()>;

    /// Create missing tables and columns.
    async fn initialize_schema(&self) -> Result<()>;

    /// Every document of a collection.
    async fn list(&self, collection: Collection) -> Result<Vec<Value>>;

    /// One document by id.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>>;

    /// Insert or update a document, keyed by its `id` field.
    async fn upsert(&self, collection: Collection, document: &Value) -> Result<()>;

    /// Remove a document. Removing a missing id is not an error.
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    /// Read a setting.
    async fn get_setting(&self, key: &str) -> Result<Option<Value>>;

    /// Write a setting.
    async fn put_setting(&self, key: &str, value: &Value) -> Result<()>;
}

/// The `id` field of a document.
///
/// # Errors
///
/// Returns an error when the document has no string id.
pub fn document_id(document: &Value) -> Result<&str> {
    document
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::internal("document has no id"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_document_id() {
        assert_eq!(document_id(&json!({"id": "abc"})).unwrap(), "abc");
        assert!(document_id(&json!({"id": ""})).is_err());
        assert!(document_id(&json!({"name": "x"})).is_err());
        assert!(document_id(&json!({"id": 5})).is_err());
    }
}
