//! In-process remote store.
//!
//! Used in tests and for offline dry runs. It can be switched unavailable to
//! exercise the fallback and outbox paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::{document_id, RemoteStore};
use crate::error::{Error, Result};
use crate::model::Collection;

#[derive(Debug, Default)]
struct Tables {
    records: BTreeMap<&'static str, BTreeMap<String, Value>>,
    settings: BTreeMap<String, Value>,
}

/// Remote store kept in memory.
#[derive(Debug)]
pub struct MemoryRemote {
    tables: Mutex<Tables>,
    available: AtomicBool,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// An empty, available store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Make every following call fail (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of documents held for a collection.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.lock()
            .map(|tables| tables.records.get(collection.table()).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Whether the store holds no documents for a collection.
    #[must_use]
    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    fn check(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Remote(sqlx::Error::PoolTimedOut))
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::internal("memory remote lock poisoned"))
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.check()
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Value>> {
        self.check()?;
        Ok(self
            .lock()?
            .records
            .get(collection.table())
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        self.check()?;
        Ok(self
            .lock()?
            .records
            .get(collection.table())
            .and_then(|table| table.get(id).cloned()))
    }

    async fn upsert(&self, collection: Collection, document: &Value) -> Result<()> {
        self.check()?;
        let id = document_id(document)?.to_string();
        self.lock()?
            .records
            .entry(collection.table())
            .or_default()
            .insert(id, document.clone());
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.check()?;
        if let Some(table) = self.lock()?.records.get_mut(collection.table()) {
            table.remove(id);
        }
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        self.check()?;
        Ok(self.lock()?.settings.get(key).cloned())
    }

    async fn put_setting(&self, key: &str, value: &Value) -> Result<()> {
        self.check()?;
        self.lock()?.settings.insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_upsert_get_delete() {
        let remote = MemoryRemote::new();
        let doc = json!({"id": "c1", "name": "Ana"});

        remote.upsert(Collection::Customers, &doc).await.unwrap();
        assert_eq!(
            remote.get(Collection::Customers, "c1").await.unwrap(),
            Some(doc)
        );
        assert_eq!(remote.len(Collection::Customers), 1);

        remote.delete(Collection::Customers, "c1").await.unwrap();
        assert!(remote.is_empty(Collection::Customers));
        remote.delete(Collection::Customers, "c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_unavailable() {
        let remote = MemoryRemote::new();
        remote.set_available(false);

        let err = remote.ping().await.unwrap_err();
        assert!(err.is_remote());
        assert!(remote.list(Collection::Orders).await.is_err());

        remote.set_available(true);
        assert!(remote.list(Collection::Orders).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settings() {
        let remote = MemoryRemote::new();
        assert!(remote.get_setting("k").await.unwrap().is_none());
        remote.put_setting("k", &json!([1, 2])).await.unwrap();
        assert_eq!(remote.get_setting("k").await.unwrap(), Some(json!([1, 2])));
    }
}
