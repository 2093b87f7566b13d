use async_trait::async_trait;
use tokio::sync::RwLock;

use huddlematch_core::domain::{AvailabilityRecord, AvailabilitySlot};
use huddlematch_core::repository::{AvailabilityRepository, StorageError};

/// In-memory stand-in for the SQLite repository. Useful for local runs
/// without a database file and for wiring tests in downstream crates.
#[derive(Default)]
pub struct InMemoryAvailabilityRepository {
    records: RwLock<Vec<AvailabilityRecord>>,
}

impl InMemoryAvailabilityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityRepository for InMemoryAvailabilityRepository {
    async fn get(
        &self,
        user_id: &str,
        slot: &AvailabilitySlot,
    ) -> Result<Option<AvailabilityRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| record.user_id == user_id && &record.slot == slot)
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
        let records = self.records.read().await;
        Ok(records.clone())
    }

    async fn delete(
        &self,
        user_id: &str,
        slot: &AvailabilitySlot,
    ) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records.retain(|record| !(record.user_id == user_id && &record.slot == slot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use huddlematch_core::domain::{AvailabilityRecord, AvailabilitySlot};
    use huddlematch_core::repository::AvailabilityRepository;

    use super::InMemoryAvailabilityRepository;

    fn record(user_id: &str, slot: &str) -> AvailabilityRecord {
        AvailabilityRecord {
            user_id: user_id.to_string(),
            slot: AvailabilitySlot(slot.to_string()),
            channel_id: "C1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn put_is_first_write_wins() {
        let repo = InMemoryAvailabilityRepository::new();
        let first = record("U1", "2024-01-02T10:00");
        let mut second = record("U1", "2024-01-02T10:00");
        second.channel_id = "C-other".to_string();

        repo.put(first.clone()).await.expect("first put");
        repo.put(second).await.expect("second put");

        let found = repo
            .get("U1", &AvailabilitySlot("2024-01-02T10:00".to_string()))
            .await
            .expect("get");
        assert_eq!(found, Some(first));
    }

    #[tokio::test]
    async fn scan_returns_records_in_insertion_order() {
        let repo = InMemoryAvailabilityRepository::new();
        repo.put(record("U2", "2024-01-02T10:00")).await.expect("put");
        repo.put(record("U1", "2024-01-02T10:00")).await.expect("put");

        let users: Vec<String> = repo
            .scan_all()
            .await
            .expect("scan")
            .into_iter()
            .map(|entry| entry.user_id)
            .collect();
        assert_eq!(users, vec!["U2", "U1"]);
    }

    #[tokio::test]
    async fn delete_removes_only_the_addressed_record() {
        let repo = InMemoryAvailabilityRepository::new();
        repo.put(record("U1", "2024-01-02T10:00")).await.expect("put");
        repo.put(record("U1", "2024-01-02T10:30")).await.expect("put");

        repo.delete("U1", &AvailabilitySlot("2024-01-02T10:00".to_string()))
            .await
            .expect("delete");

        let remaining = repo.query_by_user("U1").await.expect("query");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].slot.as_str(), "2024-01-02T10:30");
    }
}
