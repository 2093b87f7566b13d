use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::clock::Clock;
use crate::domain::{AvailabilityRecord, AvailabilitySlot};
use crate::repository::{AvailabilityRepository, StorageError};

/// Per-user availability bookkeeping over the repository contract.
///
/// Stateless between calls; the repository and clock are injected so the
/// whole service swaps out for fakes under test.
pub struct Scheduler {
    repository: Arc<dyn AvailabilityRepository>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(repository: Arc<dyn AvailabilityRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Writes a record for `(user_id, slot)` unless one already exists.
    ///
    /// Returns `false` without writing on a duplicate — a defined no-op,
    /// not an error. The get-then-put sequence is the store contract's
    /// check-then-act; the SQLite repository additionally refuses to
    /// clobber an existing row, which closes the concurrent-writer race.
    pub async fn register_availability(
        &self,
        user_id: &str,
        slot: &AvailabilitySlot,
        channel_id: &str,
    ) -> Result<bool, StorageError> {
        if self.repository.get(user_id, slot).await?.is_some() {
            debug!(user_id, slot = %slot, "slot already registered; skipping");
            return Ok(false);
        }

        self.repository
            .put(AvailabilityRecord {
                user_id: user_id.to_string(),
                slot: slot.clone(),
                channel_id: channel_id.to_string(),
                created_at: self.clock.now(),
            })
            .await?;
        Ok(true)
    }

    /// All of one user's records, sorted chronologically by slot key.
    pub async fn list_availabilities(
        &self,
        user_id: &str,
    ) -> Result<Vec<AvailabilityRecord>, StorageError> {
        let mut records = self.repository.query_by_user(user_id).await?;
        records.sort_by(|left, right| left.slot.cmp(&right.slot));
        Ok(records)
    }

    /// Deletes the given slots one by one. Absent slots are silently
    /// skipped (repository deletes are idempotent).
    pub async fn delete_slots(
        &self,
        user_id: &str,
        slots: &[AvailabilitySlot],
    ) -> Result<(), StorageError> {
        for slot in slots {
            self.repository.delete(user_id, slot).await?;
        }
        Ok(())
    }

    /// Removes every record the user holds, dispatching the deletes
    /// concurrently. No ordering, no rollback: a failed delete aborts the
    /// batch but already-completed deletes stand, which is safe because the
    /// operation is idempotent and retryable.
    pub async fn delete_all_user_availabilities(
        &self,
        user_id: &str,
    ) -> Result<usize, StorageError> {
        let records = self.repository.query_by_user(user_id).await?;
        try_join_all(
            records.iter().map(|record| self.repository.delete(&record.user_id, &record.slot)),
        )
        .await?;
        Ok(records.len())
    }
}
