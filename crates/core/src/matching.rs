use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::clock::Clock;
use crate::domain::{AvailabilitySlot, Match};
use crate::repository::{AvailabilityRepository, StorageError};

/// Upper bound on group size when no configuration overrides it.
pub const DEFAULT_MAX_USERS_PER_MATCH: usize = 5;

/// Partitions same-slot users into bounded groups and reaps stale records.
pub struct MatchEngine {
    repository: Arc<dyn AvailabilityRepository>,
    clock: Arc<dyn Clock>,
    max_users_per_match: usize,
}

impl MatchEngine {
    pub fn new(
        repository: Arc<dyn AvailabilityRepository>,
        clock: Arc<dyn Clock>,
        max_users_per_match: usize,
    ) -> Self {
        Self { repository, clock, max_users_per_match: max_users_per_match.max(1) }
    }

    /// Groups every record registered for exactly `target`.
    ///
    /// First-fit greedy in scan order: each record joins the first group
    /// with spare capacity, otherwise it opens a new group. Group output
    /// order is first-created order; the last group may be under-full.
    /// Deliberately not a balanced partition — deterministic for a fixed
    /// scan order is the contract.
    pub async fn create_matches(
        &self,
        target: &AvailabilitySlot,
    ) -> Result<Vec<Match>, StorageError> {
        let records = self.repository.scan_all().await?;

        let mut groups: Vec<Match> = Vec::new();
        for record in records.iter().filter(|record| record.slot == *target) {
            match groups.iter_mut().find(|group| group.len() < self.max_users_per_match) {
                Some(group) => group.admit(record),
                None => groups.push(Match::seeded_with(record)),
            }
        }

        debug!(
            target = %target,
            groups = groups.len(),
            users = groups.iter().map(Match::len).sum::<usize>(),
            "matching pass grouped availability records"
        );
        Ok(groups)
    }

    /// Deletes every record whose slot is strictly before the current
    /// minute and returns how many were removed.
    ///
    /// A record at exactly the current slot survives. Deletes go out
    /// concurrently; a failure aborts the batch without rolling back
    /// completed deletes, leaving a partially-reaped store that the next
    /// run finishes. Scan failures propagate unchanged — isolating them
    /// from the matching pass is the periodic trigger's job, not ours.
    pub async fn delete_past_availabilities(&self) -> Result<usize, StorageError> {
        let records = self.repository.scan_all().await?;
        let current = AvailabilitySlot::from_datetime(self.clock.now());

        let past: Vec<_> = records.into_iter().filter(|record| record.slot < current).collect();
        try_join_all(
            past.iter().map(|record| self.repository.delete(&record.user_id, &record.slot)),
        )
        .await?;

        Ok(past.len())
    }
}
