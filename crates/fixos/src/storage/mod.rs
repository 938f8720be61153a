//! Local storage layer for fixos.
//!
//! This module provides `SQLite`-based persistent storage for every record
//! collection, the settings map and the outbox of remote mutations that
//! still need to be replayed. The local store is always written, whether or
//! not cloud mode is enabled.

pub mod migrations;
mod outbox;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{Collection, Entity};

pub use outbox::{OutboxEntry, OutboxOp, SETTINGS_TABLE};

/// Local record store.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    pub fn put<T: Entity>(&self, record: &T) -> Result<()> {
        let data = serde_json::to_string(record)?;
        let table = T::COLLECTION.table();
        self.conn.execute(
            &format!(
                "INSERT INTO {table} (id, sort_key, data, updated_at)
                 VALUES (?1, ?2, ?3, datetime('now'))
                 ON CONFLICT(id) DO UPDATE SET
                    sort_key = excluded.sort_key,
                    data = excluded.data,
                    updated_at = excluded.updated_at"
            ),
            params![record.id(), record.sort_key(), data],
        )?;
        debug!(collection = table, id = record.id(), "stored record locally");
        Ok(())
    }

    /// Get a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored document is malformed.
    pub fn get<T: Entity>(&self, id: &str) -> Result<Option<T>> {
        self.get_document(T::COLLECTION, id)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Error::from)
    }

    /// Get a record's raw JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored text is not JSON.
    pub fn get_document(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let data: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT data FROM {} WHERE id = ?1", collection.table()),
                [id],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|text| serde_json::from_str(&text))
            .transpose()
            .map_err(Error::from)
    }

    /// List every record of a collection in listing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored document is malformed.
    pub fn list<T: Entity>(&self) -> Result<Vec<T>> {
        self.list_documents(T::COLLECTION)?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(Error::from))
            .collect()
    }

    /// List every raw document of a collection in listing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored text is not JSON.
    pub fn list_documents(&self, collection: Collection) -> Result<Vec<Value>> {
        let direction = if collection.descending() { "DESC" } else { "ASC" };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT data FROM {} ORDER BY sort_key {direction}, id",
            collection.table()
        ))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.iter()
            .map(|text| serde_json::from_str(text).map_err(Error::from))
            .collect()
    }

    /// List records whose indexed `field` equals `value`.
    ///
    /// `field` must be one of the fields listed by
    /// [`schema::indexed_fields`] for the collection.
    ///
    /// # Errors
    ///
    /// Returns an error for an unindexed field or if the query fails.
    pub fn find_by<T: Entity>(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let collection = T::COLLECTION;
        if !schema::indexed_fields(collection).contains(&field) {
            return Err(Error::internal(format!(
                "field {field} is not indexed on {collection}"
            )));
        }
        let direction = if collection.descending() { "DESC" } else { "ASC" };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT data FROM {table} WHERE {expr} = ?1 ORDER BY sort_key {direction}, id",
            table = collection.table(),
            expr = schema::field_expr(field)
        ))?;
        let rows = stmt
            .query_map([value], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.iter()
            .map(|text| serde_json::from_str(text).map_err(Error::from))
            .collect()
    }

    /// Delete a record.
    ///
    /// Returns `true` if a record was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", collection.table()),
            [id],
        )?;
        debug!(collection = collection.table(), id, "deleted local record");
        Ok(affected > 0)
    }

    /// Replace the whole content of a collection in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any record cannot be written; nothing is changed then.
    pub fn replace_all<T: Entity>(&mut self, records: &[T]) -> Result<usize> {
        let table = T::COLLECTION.table();
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {table} (id, sort_key, data) VALUES (?1, ?2, ?3)"
            ))?;
            for record in records {
                let data = serde_json::to_string(record)?;
                stmt.execute(params![record.id(), record.sort_key(), data])?;
            }
        }
        tx.commit()?;
        info!(collection = table, count = records.len(), "replaced collection");
        Ok(records.len())
    }

    /// Count records in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self, collection: Collection) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Read a setting value.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value is not JSON.
    pub fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        value
            .map(|text| serde_json::from_str(&text))
            .transpose()
            .map_err(Error::from)
    }

    /// Write a setting value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn put_setting(&self, key: &str, value: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value.to_string()],
        )?;
        debug!(key, "stored setting locally");
        Ok(())
    }

    /// Every stored setting, by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored value is not JSON.
    pub fn list_settings(&self) -> Result<Vec<(String, Value)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(key, text)| Ok((key, serde_json::from_str(&text)?)))
            .collect()
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let mut collections = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            collections.push((collection, self.count(collection)?));
        }

        let settings: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            collections,
            settings,
            pending_sync: self.outbox_count()?,
            schema_version: migrations::get_schema_version(&self.conn)?,
            db_size_bytes,
        })
    }
}

/// Statistics about the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Record count per collection.
    pub collections: Vec<(Collection, i64)>,
    /// Number of stored settings.
    pub settings: i64,
    /// Remote mutations waiting in the outbox.
    pub pending_sync: i64,
    /// Local schema version.
    pub schema_version: i32,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::model::{Customer, Equipment, Product, Sale, ServiceOrder};

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_open_in_memory() {
        assert!(Storage::open_in_memory().is_ok());
    }

    #[test]
    fn test_put_and_get() {
        let storage = create_test_storage();
        let mut customer = Customer::new("Maria", "11999990000");
        customer.email = "maria@example.com".to_string();

        storage.put(&customer).unwrap();
        let retrieved: Customer = storage.get(&customer.id).unwrap().unwrap();
        assert_eq!(retrieved, customer);
    }

    #[test]
    fn test_put_overwrites() {
        let storage = create_test_storage();
        let mut product = Product::new("Tela", Decimal::new(100, 0));
        storage.put(&product).unwrap();

        product.stock = 7;
        storage.put(&product).unwrap();

        let retrieved: Product = storage.get(&product.id).unwrap().unwrap();
        assert_eq!(retrieved.stock, 7);
        assert_eq!(storage.count(Collection::Products).unwrap(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let storage = create_test_storage();
        let result: Option<Customer> = storage.get("missing").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let storage = create_test_storage();
        for name in ["carla", "Ana", "bruno"] {
            storage.put(&Customer::new(name, "")).unwrap();
        }
        let names: Vec<String> = storage
            .list::<Customer>()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Ana", "bruno", "carla"]);
    }

    #[test]
    fn test_orders_listed_highest_number_first() {
        let storage = create_test_storage();
        for (id, number) in [("a", 1001), ("b", 1003), ("c", 1002)] {
            storage
                .put(&ServiceOrder {
                    id: id.to_string(),
                    order_number: number,
                    ..ServiceOrder::default()
                })
                .unwrap();
        }
        let numbers: Vec<u32> = storage
            .list::<ServiceOrder>()
            .unwrap()
            .iter()
            .map(|o| o.order_number)
            .collect();
        assert_eq!(numbers, vec![1003, 1002, 1001]);
    }

    #[test]
    fn test_find_by_customer() {
        let storage = create_test_storage();
        storage.put(&Equipment::new("c1", "Apple", "iPhone")).unwrap();
        storage.put(&Equipment::new("c1", "Dell", "XPS")).unwrap();
        storage.put(&Equipment::new("c2", "LG", "K10")).unwrap();

        let found: Vec<Equipment> = storage.find_by("customerId", "c1").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.customer_id == "c1"));
    }

    #[test]
    fn test_find_by_unindexed_field() {
        let storage = create_test_storage();
        let result: Result<Vec<Equipment>> = storage.find_by("brand", "Apple");
        assert!(result.is_err());
    }

    #[test]
    fn test_delete() {
        let storage = create_test_storage();
        let customer = Customer::new("Ana", "");
        storage.put(&customer).unwrap();

        assert!(storage.delete(Collection::Customers, &customer.id).unwrap());
        assert!(storage.get::<Customer>(&customer.id).unwrap().is_none());
        assert!(storage.list::<Customer>().unwrap().is_empty());
    }

    #[test]
    fn test_delete_nonexistent() {
        let storage = create_test_storage();
        assert!(!storage.delete(Collection::Customers, "nope").unwrap());
    }

    #[test]
    fn test_replace_all() {
        let mut storage = create_test_storage();
        storage.put(&Customer::new("Old", "")).unwrap();

        let fresh = vec![Customer::new("New 1", ""), Customer::new("New 2", "")];
        assert_eq!(storage.replace_all(&fresh).unwrap(), 2);

        let names: Vec<String> = storage
            .list::<Customer>()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["New 1", "New 2"]);
    }

    #[test]
    fn test_sales_round_trip_money() {
        let storage = create_test_storage();
        let sale = Sale {
            id: "s1".to_string(),
            customer_id: None,
            items: Vec::new(),
            total: Decimal::new(12345, 2),
            total_cost: Decimal::new(5000, 2),
            payment_method: "Pix".to_string(),
            created_at: "2024-03-10T12:00:00Z".parse().unwrap(),
        };
        storage.put(&sale).unwrap();
        let back: Sale = storage.get("s1").unwrap().unwrap();
        assert_eq!(back.total, Decimal::new(12345, 2));
    }

    #[test]
    fn test_settings() {
        let storage = create_test_storage();
        assert!(storage.get_setting("default_warranty").unwrap().is_none());

        storage.put_setting("default_warranty", &json!(120)).unwrap();
        storage
            .put_setting("checklist_items", &json!(["Liga", "Tela"]))
            .unwrap();

        assert_eq!(
            storage.get_setting("default_warranty").unwrap(),
            Some(json!(120))
        );
        let all = storage.list_settings().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, "checklist_items");
    }

    #[test]
    fn test_stats() {
        let storage = create_test_storage();
        storage.put(&Customer::new("Ana", "")).unwrap();
        storage.put_setting("x", &json!(1)).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.settings, 1);
        assert_eq!(stats.pending_sync, 0);
        assert_eq!(stats.schema_version, migrations::CURRENT_VERSION);
        assert_eq!(stats.db_size_bytes, 0);
        assert!(stats
            .collections
            .contains(&(Collection::Customers, 1)));
    }

    #[test]
    fn test_open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("fixos.db");

        let customer = Customer::new("Persistido", "");
        {
            let storage = Storage::open(&db_path).unwrap();
            storage.put(&customer).unwrap();
            assert_eq!(storage.path(), db_path);
            assert!(storage.stats().unwrap().db_size_bytes > 0);
        }

        let reopened = Storage::open(&db_path).unwrap();
        let back: Customer = reopened.get(&customer.id).unwrap().unwrap();
        assert_eq!(back.name, "Persistido");
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested_path = dir.path().join("nested/deeper/fixos.db");

        let _storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());
    }

    #[test]
    fn test_unicode_content() {
        let storage = create_test_storage();
        let customer = Customer::new("João Ação 日本語", "");
        storage.put(&customer).unwrap();
        let back: Customer = storage.get(&customer.id).unwrap().unwrap();
        assert_eq!(back.name, "João Ação 日本語");
    }
}
