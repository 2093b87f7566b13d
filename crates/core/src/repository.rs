use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{AvailabilityRecord, AvailabilitySlot};
use crate::errors::ApplicationError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("stored record could not be decoded: {0}")]
    Decode(String),
}

impl From<StorageError> for ApplicationError {
    fn from(value: StorageError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

/// Narrow contract the core requires from the storage collaborator.
///
/// One logical table keyed by `(user_id, slot)`. Every call is a single
/// round trip; implementations that paginate must return fully-materialized
/// sequences. `delete` is idempotent: removing an absent key is not an
/// error. Failures propagate unchanged — the core adds no retry logic.
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Point lookup by composite key.
    async fn get(
        &self,
        user_id: &str,
        slot: &AvailabilitySlot,
    ) -> Result<Option<AvailabilityRecord>, StorageError>;

    /// Insert-if-absent write: an existing `(user_id, slot)` row is left
    /// untouched, so the earliest record always survives even when two
    /// writers race past the scheduler's existence check.
    async fn put(&self, record: AvailabilityRecord) -> Result<(), StorageError>;

    /// All records for one user; ordering is unspecified by the store.
    async fn query_by_user(&self, user_id: &str)
        -> Result<Vec<AvailabilityRecord>, StorageError>;

    /// Full table scan, used by the reaper and the matcher.
    async fn scan_all(&self) -> Result<Vec<AvailabilityRecord>, StorageError>;

    async fn delete(
        &self,
        user_id: &str,
        slot: &AvailabilitySlot,
    ) -> Result<(), StorageError>;
}
