//! Store persisted as a JSON snapshot
//!
//! Every successful write is flushed through a [`SnapshotStorage`]. If the
//! flush fails, the in-memory store is rolled back and the write reports a
//! transport failure, so a caller never sees a change that is not on disk.

use async_trait::async_trait;
use contentdesk_common::{CollectionKind, CommonError, EntityId, LeadKind, Record, SnapshotStorage};
use contentdesk_editor::{
    FlagUpdate, GatewayError, GatewayResult, MemoryGateway, PersistenceGateway, SectionEndpoint,
    StoreSnapshot, Versioned,
};
use serde_json::{Map, Value};
use std::future::Future;
use tokio::sync::Mutex;

pub struct FileGateway {
    inner: MemoryGateway,
    storage: Box<dyn SnapshotStorage>,
    /// Serializes write + flush so a rollback never undoes another write
    write_lock: Mutex<()>,
}

impl FileGateway {
    /// Open the store kept in `storage`; an empty storage is an empty store
    pub fn open(storage: Box<dyn SnapshotStorage>) -> Result<Self, CommonError> {
        let snapshot = match storage.load()? {
            Some(contents) => serde_json::from_str::<StoreSnapshot>(&contents)?,
            None => StoreSnapshot::default(),
        };
        tracing::debug!(
            sections = snapshot.sections.len(),
            collections = snapshot.collections.len(),
            "store opened"
        );

        Ok(Self {
            inner: MemoryGateway::from_snapshot(snapshot),
            storage,
            write_lock: Mutex::new(()),
        })
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.snapshot()
    }

    async fn persisting<T>(&self, write: impl Future<Output = GatewayResult<T>> + Send) -> GatewayResult<T> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot();

        let result = write.await?;
        if let Err(error) = self.flush() {
            tracing::error!(%error, "failed to persist store, rolling back");
            self.inner.restore(before);
            return Err(GatewayError::Transport(format!("failed to persist store: {}", error)));
        }
        Ok(result)
    }

    fn flush(&self) -> Result<(), CommonError> {
        let contents = serde_json::to_string_pretty(&self.inner.snapshot())?;
        self.storage.store(&contents)
    }
}

#[async_trait]
impl PersistenceGateway for FileGateway {
    async fn read_section(&self, endpoint: &SectionEndpoint) -> GatewayResult<Option<Versioned<Value>>> {
        self.inner.read_section(endpoint).await
    }

    async fn write_section(
        &self,
        endpoint: &SectionEndpoint,
        value: Value,
        expected_version: Option<u64>,
    ) -> GatewayResult<Versioned<Value>> {
        self.persisting(self.inner.write_section(endpoint, value, expected_version))
            .await
    }

    async fn list_entities(&self, kind: CollectionKind) -> GatewayResult<Vec<Record>> {
        self.inner.list_entities(kind).await
    }

    async fn create_entity(&self, kind: CollectionKind, template: Value) -> GatewayResult<Record> {
        self.persisting(self.inner.create_entity(kind, template)).await
    }

    async fn update_entity(
        &self,
        kind: CollectionKind,
        id: &EntityId,
        fields: Map<String, Value>,
    ) -> GatewayResult<()> {
        self.persisting(self.inner.update_entity(kind, id, fields)).await
    }

    async fn update_entity_flags(
        &self,
        kind: CollectionKind,
        id: &EntityId,
        flags: &FlagUpdate,
    ) -> GatewayResult<()> {
        self.persisting(self.inner.update_entity_flags(kind, id, flags))
            .await
    }

    async fn delete_entity(&self, kind: CollectionKind, id: &EntityId) -> GatewayResult<()> {
        self.persisting(self.inner.delete_entity(kind, id)).await
    }

    async fn list_leads(&self, kind: LeadKind) -> GatewayResult<Vec<Record>> {
        self.inner.list_leads(kind).await
    }

    async fn update_lead_status(&self, kind: LeadKind, id: &EntityId, status: &str) -> GatewayResult<()> {
        self.persisting(self.inner.update_lead_status(kind, id, status))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentdesk_common::MockSnapshotStorage;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_write_is_flushed() {
        let storage = Arc::new(MockSnapshotStorage::new());
        let gateway = FileGateway::open(Box::new(storage.clone())).unwrap();

        gateway
            .write_section(&SectionEndpoint::ContactInfo, json!({"phone": ["1"]}), Some(0))
            .await
            .unwrap();

        let stored: StoreSnapshot = serde_json::from_str(&storage.contents().unwrap()).unwrap();
        assert_eq!(stored.sections["contactInfo"].version, 1);
    }

    #[tokio::test]
    async fn test_failed_flush_rolls_back() {
        let storage = Arc::new(MockSnapshotStorage::new());
        let gateway = FileGateway::open(Box::new(storage.clone())).unwrap();
        storage.set_fail_writes(true);

        let err = gateway
            .create_entity(CollectionKind::Testimonials, json!({"name": "Asha"}))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(gateway
            .list_entities(CollectionKind::Testimonials)
            .await
            .unwrap()
            .is_empty());
    }
}
