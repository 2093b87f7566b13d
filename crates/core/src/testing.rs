//! In-memory repository fakes shared by the core unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{AvailabilityRecord, AvailabilitySlot};
use crate::repository::{AvailabilityRepository, StorageError};

/// Vec-backed repository that preserves insertion order on `scan_all`, so
/// first-fit grouping tests can pin encounter order.
#[derive(Default)]
pub(crate) struct MemoryRepository {
    records: RwLock<Vec<AvailabilityRecord>>,
    pub(crate) deletes: AtomicUsize,
}

impl MemoryRepository {
    pub(crate) async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub(crate) fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvailabilityRepository for MemoryRepository {
    async fn get(
        &self,
        user_id: &str,
        slot: &AvailabilitySlot,
    ) -> Result<Option<AvailabilityRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| record.user_id == user_id && record.slot == *slot)
            .cloned())
    }

    async fn put(&self, record: AvailabilityRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        let exists = records
            .iter()
            .any(|existing| existing.user_id == record.user_id && existing.slot == record.slot);
        if !exists {
            records.push(record);
        }
        Ok(())
    }

    async fn query_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<AvailabilityRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|record| record.user_id == user_id).cloned().collect())
    }

    async fn scan_all(&self) -> Result<Vec<AvailabilityRecord>, StorageError> {
        Ok(self.records.read().await.clone())
    }

    async fn delete(
        &self,
        user_id: &str,
        slot: &AvailabilitySlot,
    ) -> Result<(), StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.write().await;
        records.retain(|record| !(record.user_id == user_id && record.slot == *slot));
        Ok(())
    }
}

/// Repository whose bulk operations fail, for error-propagation tests.
#[derive(Default)]
pub(crate) struct FailingRepository {
    pub(crate) failures: HashMap<&'static str, String>,
}

impl FailingRepository {
    pub(crate) fn failing_scan(message: &str) -> Self {
        let mut failures = HashMap::new();
        failures.insert("scan_all", message.to_string());
        Self { failures }
    }

    fn fail_if_scripted(&self, operation: &'static str) -> Result<(), StorageError> {
        match self.failures.get(operation) {
            Some(message) => Err(StorageError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AvailabilityRepository for FailingRepository {
    async fn get(
        &self,
        _user_id: &str,
        _slot: &AvailabilitySlot,
    ) -> Result<Option<AvailabilityRecord>, StorageError> {
        self.fail_if_scripted("get")?;
        Ok(None)
    }

    async fn put(&self, _record: AvailabilityRecord) -> Result<(), StorageError> {
        self.fail_if_scripted("put")
    }

    async fn query_by_user(
        &self,
        _user_id: &str,
    ) -> Result<Vec<AvailabilityRecord>, StorageError> {
        self.fail_if_scripted("query_by_user")?;
        Ok(Vec::new())
    }

    async fn scan_all(&self) -> Result<Vec<AvailabilityRecord>, StorageError> {
        self.fail_if_scripted("scan_all")?;
        Ok(Vec::new())
    }

    async fn delete(
        &self,
        _user_id: &str,
        _slot: &AvailabilitySlot,
    ) -> Result<(), StorageError> {
        self.fail_if_scripted("delete")
    }
}
