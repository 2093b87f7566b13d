use async_trait::async_trait;
use chrono::{DateTime, Utc};

use huddlematch_core::domain::{AvailabilityRecord, AvailabilitySlot};
use huddlematch_core::repository::{AvailabilityRepository, StorageError};

use crate::DbPool;

pub mod memory;

pub use memory::InMemoryAvailabilityRepository;

/// SQLite-backed availability table.
///
/// `put` is an `INSERT .. ON CONFLICT DO NOTHING`, so the first record
/// written for a `(user_id, slot)` key wins even when concurrent writers
/// race past the scheduler's existence check. `scan_all` returns rows in
/// insertion order, which makes matching runs reproducible.
pub struct SqlAvailabilityRepository {
    pool: DbPool,
}

impl SqlAvailabilityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

type AvailabilityRow = (String, String, String, String);

fn backend(error: sqlx::Error) -> StorageError {
    StorageError::Backend(error.to_string())
}

fn decode_row(row: AvailabilityRow) -> Result<AvailabilityRecord, StorageError> {
    let (user_id, slot, channel_id, created_at) = row;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|error| {
            StorageError::Decode(format!("bad created_at `{created_at}`: {error}"))
        })?
        .with_timezone(&Utc);

    Ok(AvailabilityRecord { user_id, slot: AvailabilitySlot(slot), channel_id, created_at })
}

#[async_trait]
impl AvailabilityRepository for SqlAvailabilityRepository {
    async fn get(
        &self,
        user_id: &str,
        slot: &AvailabilitySlot,
    ) -> Result<Option<AvailabilityRecord>, StorageError> {
        let row = sqlx::query_as::<_, AvailabilityRow>(
            "SELECT user_id, slot, channel_id, created_at FROM availability \
             WHERE user_id = ? AND slot = ?",
        )
        .bind(user_id)
        .bind(slot.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(decode_row).transpose()
    }

    async fn put(&self, record: AvailabilityRecord) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO availability (user_id, slot, channel_id, created_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (user_id, slot) DO NOTHING",
        )
        .bind(&record.user_id)
        .bind(record.slot.as_str())
        .bind(&record.channel_id)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn query_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<AvailabilityRecord>, StorageError> {
        let rows = sqlx::query_as::<_, AvailabilityRow>(
            "SELECT user_id, slot, channel_id, created_at FROM availability \
             WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(decode_row).collect()
    }

    async fn scan_all(&self) -> Result<Vec<AvailabilityRecord>, StorageError> {
        let rows = sqlx::query_as::<_, AvailabilityRow>(
            "SELECT user_id, slot, channel_id, created_at FROM availability \
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(decode_row).collect()
    }

    async fn delete(
        &self,
        user_id: &str,
        slot: &AvailabilitySlot,
    ) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM availability WHERE user_id = ? AND slot = ?")
            .bind(user_id)
            .bind(slot.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(())
    }
}
