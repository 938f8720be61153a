//! Dual-mode record access.
//!
//! Every write lands in the local store first. In cloud mode it is then
//! mirrored to the remote; a remote failure is logged and queued in the
//! local outbox instead of failing the call. Reads prefer the remote and fall
//! back to the local copy when the remote cannot answer. A record with a
//! queued mutation is always read locally until the outbox is replayed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Collection, Entity};
use crate::remote::{PgRemote, RemoteStore};
use crate::storage::{OutboxEntry, OutboxOp, Storage, SETTINGS_TABLE};

/// Outcome of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Mutations tried.
    pub attempted: usize,
    /// Mutations the remote accepted.
    pub pushed: usize,
    /// Mutations that failed and remain queued.
    pub failed: usize,
    /// One message per failure.
    pub errors: Vec<String>,
}

impl SyncReport {
    fn record(&mut self, result: Result<()>, what: &str) {
        self.attempted += 1;
        match result {
            Ok(()) => self.pushed += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push(format!("{what}: {e}"));
            }
        }
    }
}

/// Record access over the local store and an optional remote mirror.
#[derive(Debug)]
pub struct Repository<R = PgRemote> {
    storage: Storage,
    remote: Option<R>,
}

impl<R: RemoteStore> Repository<R> {
    /// Local-only mode.
    #[must_use]
    pub fn local(storage: Storage) -> Self {
        Self {
            storage,
            remote: None,
        }
    }

    /// Cloud mode when `remote` is set.
    #[must_use]
    pub fn new(storage: Storage, remote: Option<R>) -> Self {
        Self { storage, remote }
    }

    /// The local store.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The remote mirror, if cloud mode is on.
    #[must_use]
    pub fn remote(&self) -> Option<&R> {
        self.remote.as_ref()
    }

    /// Whether writes are mirrored.
    #[must_use]
    pub fn is_cloud(&self) -> bool {
        self.remote.is_some()
    }

    fn require_remote(&self) -> Result<&R> {
        self.remote.as_ref().ok_or(Error::RemoteNotConfigured)
    }

    /// Every record of a collection, in listing order.
    ///
    /// # Errors
    ///
    /// Returns an error only when the local store fails.
    pub async fn list<T: Entity>(&self) -> Result<Vec<T>> {
        if let Some(remote) = &self.remote {
            match remote.list(T::COLLECTION).await.and_then(decode_all::<T>) {
                Ok(records) => return self.overlay_pending(records),
                Err(e) => warn!(
                    collection = T::COLLECTION.table(),
                    error = %e,
                    "remote list failed, using local copy"
                ),
            }
        }
        self.storage.list()
    }

    /// One record by id.
    ///
    /// # Errors
    ///
    /// Returns an error only when the local store fails.
    pub async fn get<T: Entity>(&self, id: &str) -> Result<Option<T>> {
        let table = T::COLLECTION.table();
        if let Some(remote) = &self.remote {
            if self.storage.pending_op(table, id)?.is_some() {
                debug!(collection = table, id, "unsynced local change, using local copy");
                return self.storage.get(id);
            }
            match remote.get(T::COLLECTION, id).await {
                Ok(Some(doc)) => match serde_json::from_value(doc) {
                    Ok(record) => return Ok(Some(record)),
                    Err(e) => warn!(
                        collection = table,
                        id,
                        error = %e,
                        "remote document unreadable, using local copy"
                    ),
                },
                Ok(None) => {}
                Err(e) => warn!(
                    collection = table,
                    id,
                    error = %e,
                    "remote get failed, using local copy"
                ),
            }
        }
        self.storage.get(id)
    }

    /// One record by id, which must exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no store has the record.
    pub async fn require<T: Entity>(&self, id: &str) -> Result<T> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found(T::KIND, id))
    }

    /// Insert or update a record.
    ///
    /// # Errors
    ///
    /// Returns an error only when the local store fails.
    pub async fn save<T: Entity>(&self, record: &T) -> Result<()> {
        self.storage.put(record)?;
        if self.remote.is_some() {
            let document = serde_json::to_value(record)?;
            // A remote failure has been logged and queued by now.
            let _ = self
                .mirror_upsert(T::COLLECTION, record.id(), &document)
                .await?;
        }
        Ok(())
    }

    /// Delete a record. Returns whether it existed locally.
    ///
    /// # Errors
    ///
    /// Returns an error only when the local store fails.
    pub async fn delete<T: Entity>(&self, id: &str) -> Result<bool> {
        let existed = self.storage.delete(T::COLLECTION, id)?;
        if let Some(remote) = &self.remote {
            let table = T::COLLECTION.table();
            match remote.delete(T::COLLECTION, id).await {
                Ok(()) => {
                    self.storage.remove_outbox(table, id)?;
                }
                Err(e) => self.queue_failure(table, id, OutboxOp::Delete, &e)?,
            }
        }
        Ok(existed)
    }

    /// Replace a whole collection locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the local transaction fails.
    pub fn replace_all<T: Entity>(&mut self, records: &[T]) -> Result<usize> {
        self.storage.replace_all(records)
    }

    /// A setting, or `default` when unset or unreadable.
    ///
    /// # Errors
    ///
    /// Returns an error only when the local store fails.
    pub async fn setting<V: DeserializeOwned>(&self, key: &str, default: V) -> Result<V> {
        let unsynced =
            self.remote.is_some() && self.storage.pending_op(SETTINGS_TABLE, key)?.is_some();
        if let Some(remote) = self.remote.as_ref().filter(|_| !unsynced) {
            match remote.get_setting(key).await {
                Ok(Some(value)) => match serde_json::from_value(value) {
                    Ok(parsed) => return Ok(parsed),
                    Err(e) => warn!(key, error = %e, "remote setting unreadable, using local copy"),
                },
                Ok(None) => {}
                Err(e) => warn!(key, error = %e, "remote setting read failed, using local copy"),
            }
        }
        match self.storage.get_setting(key)? {
            Some(value) => Ok(serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(key, error = %e, "stored setting unreadable, using default");
                default
            })),
            None => Ok(default),
        }
    }

    /// Store a setting.
    ///
    /// # Errors
    ///
    /// Returns an error only when the local store fails.
    pub async fn save_setting<V: Serialize>(&self, key: &str, value: &V) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.storage.put_setting(key, &value)?;
        let _ = self.mirror_setting(key, &value).await?;
        Ok(())
    }

    /// Check that the remote answers.
    ///
    /// # Errors
    ///
    /// Returns an error when cloud mode is off or the remote is unreachable.
    pub async fn test_connection(&self) -> Result<()> {
        self.require_remote()?.ping().await?;
        info!("remote database reachable");
        Ok(())
    }

    /// Create remote tables and apply additive column migrations.
    ///
    /// # Errors
    ///
    /// Returns an error when cloud mode is off or a statement fails.
    pub async fn initialize_remote(&self) -> Result<()> {
        self.require_remote()?.initialize_schema().await
    }

    /// Replay queued remote mutations. Successes leave the queue.
    ///
    /// # Errors
    ///
    /// Returns an error when cloud mode is off or the local store fails.
    pub async fn sync_pending(&self) -> Result<SyncReport> {
        let remote = self.require_remote()?;
        let mut report = SyncReport::default();

        for entry in self.storage.pending_outbox()? {
            let result = self.replay(remote, &entry).await;
            match &result {
                Ok(()) => {
                    self.storage.remove_outbox(&entry.table, &entry.record_id)?;
                }
                Err(e) => {
                    self.storage.enqueue_outbox(&OutboxEntry {
                        error: Some(e.to_string()),
                        ..entry.clone()
                    })?;
                }
            }
            report.record(result, &format!("{}/{}", entry.table, entry.record_id));
        }

        info!(
            attempted = report.attempted,
            pushed = report.pushed,
            failed = report.failed,
            "outbox sync finished"
        );
        Ok(report)
    }

    async fn replay(&self, remote: &R, entry: &OutboxEntry) -> Result<()> {
        if entry.table == SETTINGS_TABLE {
            return match self.storage.get_setting(&entry.record_id)? {
                Some(value) => remote.put_setting(&entry.record_id, &value).await,
                None => Ok(()),
            };
        }

        let collection: Collection = entry.table.parse()?;
        let local = match entry.operation {
            OutboxOp::Upsert => self.storage.get_document(collection, &entry.record_id)?,
            OutboxOp::Delete => None,
        };
        match local {
            Some(document) => remote.upsert(collection, &document).await,
            // Deleted locally since the failure: the remote copy goes too.
            None => remote.delete(collection, &entry.record_id).await,
        }
    }

    /// Push every local record and setting to the remote.
    ///
    /// Failures are queued in the outbox like ordinary write failures.
    ///
    /// # Errors
    ///
    /// Returns an error when cloud mode is off or the local store fails.
    pub async fn push_all(&self) -> Result<SyncReport> {
        self.require_remote()?;
        let mut report = SyncReport::default();

        for collection in Collection::ALL {
            for document in self.storage.list_documents(collection)? {
                let id = crate::remote::document_id(&document)?.to_string();
                let result = self.mirror_upsert(collection, &id, &document).await?;
                report.record(result, &format!("{}/{id}", collection.table()));
            }
        }

        for (key, value) in self.storage.list_settings()? {
            let result = self.mirror_setting(&key, &value).await?;
            report.record(result, &format!("{SETTINGS_TABLE}/{key}"));
        }

        info!(
            attempted = report.attempted,
            pushed = report.pushed,
            failed = report.failed,
            "full push finished"
        );
        Ok(report)
    }

    /// Mirror one document. The outer result is the local bookkeeping, the
    /// inner one the remote outcome.
    async fn mirror_upsert(
        &self,
        collection: Collection,
        id: &str,
        document: &Value,
    ) -> Result<Result<()>> {
        let Some(remote) = &self.remote else {
            return Ok(Ok(()));
        };
        let table = collection.table();
        match remote.upsert(collection, document).await {
            Ok(()) => {
                self.storage.remove_outbox(table, id)?;
                debug!(collection = table, id, "mirrored record");
                Ok(Ok(()))
            }
            Err(e) => {
                self.queue_failure(table, id, OutboxOp::Upsert, &e)?;
                Ok(Err(e))
            }
        }
    }

    async fn mirror_setting(&self, key: &str, value: &Value) -> Result<Result<()>> {
        let Some(remote) = &self.remote else {
            return Ok(Ok(()));
        };
        match remote.put_setting(key, value).await {
            Ok(()) => {
                self.storage.remove_outbox(SETTINGS_TABLE, key)?;
                Ok(Ok(()))
            }
            Err(e) => {
                self.queue_failure(SETTINGS_TABLE, key, OutboxOp::Upsert, &e)?;
                Ok(Err(e))
            }
        }
    }

    /// Replace remote copies of records with queued mutations by the local
    /// state: the local document for an upsert, nothing for a delete.
    fn overlay_pending<T: Entity>(&self, mut records: Vec<T>) -> Result<Vec<T>> {
        let pending = self.storage.pending_ops(T::COLLECTION.table())?;
        if !pending.is_empty() {
            records.retain(|r| !pending.iter().any(|(id, _)| id == r.id()));
            for (id, op) in &pending {
                if *op == OutboxOp::Upsert {
                    if let Some(local) = self.storage.get::<T>(id)? {
                        records.push(local);
                    }
                }
            }
        }
        sort_records(&mut records);
        Ok(records)
    }

    fn queue_failure(&self, table: &str, id: &str, operation: OutboxOp, error: &Error) -> Result<()> {
        warn!(
            table,
            id,
            %operation,
            error = %error,
            "remote write failed, queued for sync"
        );
        self.storage.enqueue_outbox(&OutboxEntry::new(
            table,
            id,
            operation,
            Some(error.to_string()),
        ))
    }
}

fn decode_all<T: Entity>(documents: Vec<Value>) -> Result<Vec<T>> {
    documents
        .into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(Error::from))
        .collect()
}

/// Order records the way local listings are ordered.
pub fn sort_records<T: Entity>(records: &mut [T]) {
    if T::COLLECTION.descending() {
        records.sort_by_key(|r| std::cmp::Reverse(r.sort_key()));
    } else {
        records.sort_by_key(T::sort_key);
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::model::{Customer, FinancialAccount, Product, ServiceOrder};
    use crate::remote::MemoryRemote;

    fn local_repo() -> Repository<MemoryRemote> {
        Repository::local(Storage::open_in_memory().unwrap())
    }

    fn cloud_repo() -> Repository<MemoryRemote> {
        crate::logging::init_test_logging();
        Repository::new(Storage::open_in_memory().unwrap(), Some(MemoryRemote::new()))
    }

    #[tokio::test]
    async fn test_local_round_trip() {
        let repo = local_repo();
        let customer = Customer::new("Ana", "11999990000");

        repo.save(&customer).await.unwrap();
        let back: Customer = repo.require(&customer.id).await.unwrap();
        assert_eq!(back, customer);
        assert!(!repo.is_cloud());
    }

    #[tokio::test]
    async fn test_dual_mode_round_trip() {
        let repo = cloud_repo();
        let product = Product::new("Tela", Decimal::new(25000, 2));

        repo.save(&product).await.unwrap();
        let back: Product = repo.require(&product.id).await.unwrap();
        assert_eq!(back, product);
        assert_eq!(repo.remote().unwrap().len(Collection::Products), 1);
        assert!(repo.storage().get::<Product>(&product.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_from_listing() {
        let repo = cloud_repo();
        let customer = Customer::new("Ana", "");
        repo.save(&customer).await.unwrap();

        assert!(repo.delete::<Customer>(&customer.id).await.unwrap());
        assert!(repo.list::<Customer>().await.unwrap().is_empty());
        assert!(repo.remote().unwrap().is_empty(Collection::Customers));
    }

    #[tokio::test]
    async fn test_require_missing() {
        let repo = local_repo();
        let err = repo.require::<Customer>("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "customer not found: nope");
    }

    #[tokio::test]
    async fn test_remote_failure_queues_and_sync_drains() {
        let repo = cloud_repo();
        let remote = repo.remote().unwrap();
        remote.set_available(false);

        let customer = Customer::new("Offline", "");
        repo.save(&customer).await.unwrap();
        assert!(repo.storage().get::<Customer>(&customer.id).unwrap().is_some());
        assert_eq!(repo.storage().outbox_count().unwrap(), 1);

        let failed = repo.sync_pending().await.unwrap();
        assert_eq!(failed.failed, 1);
        assert_eq!(repo.storage().outbox_count().unwrap(), 1);

        remote.set_available(true);
        let report = repo.sync_pending().await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.pushed, 1);
        assert_eq!(repo.storage().outbox_count().unwrap(), 0);
        assert_eq!(remote.len(Collection::Customers), 1);
    }

    #[tokio::test]
    async fn test_queued_delete_replays_as_delete() {
        let repo = cloud_repo();
        let remote = repo.remote().unwrap();
        let customer = Customer::new("Ana", "");
        repo.save(&customer).await.unwrap();

        remote.set_available(false);
        repo.delete::<Customer>(&customer.id).await.unwrap();
        remote.set_available(true);
        assert_eq!(remote.len(Collection::Customers), 1);

        repo.sync_pending().await.unwrap();
        assert!(remote.is_empty(Collection::Customers));
    }

    #[tokio::test]
    async fn test_read_prefers_remote() {
        let repo = cloud_repo();
        let remote = repo.remote().unwrap();
        let mut customer = Customer::new("Local Name", "");
        repo.save(&customer).await.unwrap();

        customer.name = "Remote Name".to_string();
        remote
            .upsert(Collection::Customers, &serde_json::to_value(&customer).unwrap())
            .await
            .unwrap();

        let listed = repo.list::<Customer>().await.unwrap();
        assert_eq!(listed[0].name, "Remote Name");
        let got: Customer = repo.require(&customer.id).await.unwrap();
        assert_eq!(got.name, "Remote Name");
    }

    #[tokio::test]
    async fn test_queued_edit_survives_remote_recovery() {
        let repo = cloud_repo();
        let remote = repo.remote().unwrap();
        let mut order = ServiceOrder {
            id: "o1".to_string(),
            order_number: 1001,
            ..ServiceOrder::default()
        };
        repo.save(&order).await.unwrap();

        remote.set_available(false);
        order.labor_cost = Decimal::new(8000, 2);
        repo.save(&order).await.unwrap();
        remote.set_available(true);

        // The remote still has the old copy; reads must not bring it back.
        let got: ServiceOrder = repo.require("o1").await.unwrap();
        assert_eq!(got.labor_cost, Decimal::new(8000, 2));
        let listed = repo.list::<ServiceOrder>().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].labor_cost, Decimal::new(8000, 2));

        // The next read-modify-write carries the queued edit to the remote.
        let mut next = got;
        next.technical_report = "Troca de conector".to_string();
        repo.save(&next).await.unwrap();
        assert_eq!(repo.storage().outbox_count().unwrap(), 0);
        let mirrored = remote.get(Collection::Orders, "o1").await.unwrap().unwrap();
        let mirrored: ServiceOrder = serde_json::from_value(mirrored).unwrap();
        assert_eq!(mirrored.labor_cost, Decimal::new(8000, 2));
        assert_eq!(mirrored.technical_report, "Troca de conector");
    }

    #[tokio::test]
    async fn test_queued_delete_hidden_from_reads() {
        let repo = cloud_repo();
        let remote = repo.remote().unwrap();
        let keep = Customer::new("Bia", "");
        let gone = Customer::new("Ana", "");
        repo.save(&keep).await.unwrap();
        repo.save(&gone).await.unwrap();

        remote.set_available(false);
        repo.delete::<Customer>(&gone.id).await.unwrap();
        remote.set_available(true);
        assert_eq!(remote.len(Collection::Customers), 2);

        let listed = repo.list::<Customer>().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, keep.id);
        assert!(repo.get::<Customer>(&gone.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_queued_setting_read_locally() {
        let repo = cloud_repo();
        repo.save_setting("default_warranty", &90_u32).await.unwrap();

        repo.remote().unwrap().set_available(false);
        repo.save_setting("default_warranty", &180_u32).await.unwrap();
        repo.remote().unwrap().set_available(true);

        assert_eq!(repo.setting("default_warranty", 0_u32).await.unwrap(), 180);
    }

    #[tokio::test]
    async fn test_sparse_remote_account_still_listed() {
        let repo = cloud_repo();
        let remote = repo.remote().unwrap();
        remote
            .upsert(
                Collection::FinancialAccounts,
                &json!({"id": "a1", "description": "Aluguel", "dueDate": "2024-07-05"}),
            )
            .await
            .unwrap();

        let listed = repo.list::<FinancialAccount>().await.unwrap();
        assert_eq!(listed.len(), 1);
        let account: FinancialAccount = repo.require("a1").await.unwrap();
        assert_eq!(account.amount, Decimal::ZERO);
        assert_eq!(account.category, "Geral");
    }

    #[tokio::test]
    async fn test_read_falls_back_to_local() {
        let repo = cloud_repo();
        repo.save(&Customer::new("Ana", "")).await.unwrap();
        repo.remote().unwrap().set_available(false);

        let listed = repo.list::<Customer>().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Ana");
    }

    #[tokio::test]
    async fn test_remote_listing_sorted() {
        let repo = cloud_repo();
        for (id, number) in [("a", 1001), ("b", 1005), ("c", 1002)] {
            repo.save(&ServiceOrder {
                id: id.to_string(),
                order_number: number,
                ..ServiceOrder::default()
            })
            .await
            .unwrap();
        }
        let numbers: Vec<u32> = repo
            .list::<ServiceOrder>()
            .await
            .unwrap()
            .iter()
            .map(|o| o.order_number)
            .collect();
        assert_eq!(numbers, vec![1005, 1002, 1001]);
    }

    #[tokio::test]
    async fn test_settings_default_and_round_trip() {
        let repo = cloud_repo();
        assert_eq!(repo.setting("default_warranty", 90_u32).await.unwrap(), 90);

        repo.save_setting("default_warranty", &120_u32).await.unwrap();
        assert_eq!(repo.setting("default_warranty", 90_u32).await.unwrap(), 120);

        repo.remote().unwrap().set_available(false);
        assert_eq!(repo.setting("default_warranty", 90_u32).await.unwrap(), 120);
    }

    #[tokio::test]
    async fn test_setting_failure_queued() {
        let repo = cloud_repo();
        repo.remote().unwrap().set_available(false);
        repo.save_setting("terms_exit", &"GARANTIA").await.unwrap();

        let pending = repo.storage().pending_outbox().unwrap();
        assert_eq!(pending[0].table, SETTINGS_TABLE);
        assert_eq!(pending[0].record_id, "terms_exit");

        repo.remote().unwrap().set_available(true);
        repo.sync_pending().await.unwrap();
        assert_eq!(
            repo.remote().unwrap().get_setting("terms_exit").await.unwrap(),
            Some(json!("GARANTIA"))
        );
    }

    #[tokio::test]
    async fn test_push_all() {
        let storage = Storage::open_in_memory().unwrap();
        storage.put(&Customer::new("Ana", "")).unwrap();
        storage.put(&Product::new("Cabo", Decimal::ONE)).unwrap();
        storage.put_setting("default_warranty", &json!(60)).unwrap();

        let repo = Repository::new(storage, Some(MemoryRemote::new()));
        let report = repo.push_all().await.unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.pushed, 3);
        assert_eq!(repo.remote().unwrap().len(Collection::Customers), 1);
        assert_eq!(repo.remote().unwrap().len(Collection::Products), 1);
    }

    #[tokio::test]
    async fn test_remote_operations_need_cloud_mode() {
        let repo = local_repo();
        assert!(matches!(
            repo.test_connection().await,
            Err(Error::RemoteNotConfigured)
        ));
        assert!(repo.sync_pending().await.is_err());
        assert!(repo.push_all().await.is_err());
        assert!(repo.initialize_remote().await.is_err());
    }
}
