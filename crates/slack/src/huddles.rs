use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use huddlematch_core::clock::Clock;
use huddlematch_core::domain::{AvailabilitySlot, Match};
use huddlematch_core::matching::MatchEngine;
use huddlematch_core::repository::StorageError;

/// Groups below this size are never announced; a huddle of one is noise.
pub const DEFAULT_MIN_USERS_PER_HUDDLE: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("huddle channel setup failed: {0}")]
    ChannelSetup(String),
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Delivers one matched group to its members, typically by creating a
/// huddle channel, inviting everyone, and posting the announcement.
#[async_trait]
pub trait HuddleNotifier: Send + Sync {
    async fn notify_match(&self, matched: &Match) -> Result<(), NotifyError>;
}

#[derive(Default)]
pub struct NoopHuddleNotifier;

#[async_trait]
impl HuddleNotifier for NoopHuddleNotifier {
    async fn notify_match(&self, _matched: &Match) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchRunReport {
    pub target: AvailabilitySlot,
    pub reaped: usize,
    pub groups: usize,
    pub notified: usize,
}

/// One timed matching pass over the availability store.
///
/// A run reaps stale records, groups everyone registered for the slot
/// nearest the current half hour, and hands each large-enough group to the
/// notifier. Reaping and notification are best effort; only a failed store
/// scan during grouping aborts the run.
pub struct MatchingOrchestrator {
    engine: MatchEngine,
    notifier: Arc<dyn HuddleNotifier>,
    clock: Arc<dyn Clock>,
    min_users_per_huddle: usize,
}

impl MatchingOrchestrator {
    pub fn new(
        engine: MatchEngine,
        notifier: Arc<dyn HuddleNotifier>,
        clock: Arc<dyn Clock>,
        min_users_per_huddle: usize,
    ) -> Self {
        Self { engine, notifier, clock, min_users_per_huddle: min_users_per_huddle.max(1) }
    }

    pub async fn run(&self, correlation_id: &str) -> Result<MatchRunReport, StorageError> {
        let reaped = match self.engine.delete_past_availabilities().await {
            Ok(count) => count,
            Err(error) => {
                warn!(
                    event_name = "matching.reap_failed",
                    correlation_id,
                    error = %error,
                    "stale-record cleanup failed; matching continues"
                );
                0
            }
        };

        let target = AvailabilitySlot::nearest_half_hour(self.clock.now());
        let matches = self.engine.create_matches(&target).await?;
        let groups = matches.len();

        let mut notified = 0usize;
        for matched in &matches {
            if matched.len() < self.min_users_per_huddle {
                continue;
            }
            match self.notifier.notify_match(matched).await {
                Ok(()) => notified += 1,
                Err(error) => {
                    warn!(
                        event_name = "matching.notify_failed",
                        correlation_id,
                        slot = %matched.slot,
                        users = matched.len(),
                        error = %error,
                        "match notification failed; remaining groups continue"
                    );
                }
            }
        }

        info!(
            event_name = "matching.run_completed",
            correlation_id,
            target = %target,
            reaped,
            groups,
            notified,
            "matching run completed"
        );
        Ok(MatchRunReport { target, reaped, groups, notified })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tokio::sync::Mutex;

    use huddlematch_core::clock::FixedClock;
    use huddlematch_core::domain::{AvailabilityRecord, AvailabilitySlot, Match};
    use huddlematch_core::matching::{MatchEngine, DEFAULT_MAX_USERS_PER_MATCH};
    use huddlematch_core::repository::{AvailabilityRepository, StorageError};
    use huddlematch_db::InMemoryAvailabilityRepository;

    use super::{
        HuddleNotifier, MatchingOrchestrator, NotifyError, DEFAULT_MIN_USERS_PER_HUDDLE,
    };

    #[derive(Default)]
    struct RecordingNotifier {
        notified: Mutex<Vec<Match>>,
    }

    #[async_trait]
    impl HuddleNotifier for RecordingNotifier {
        async fn notify_match(&self, matched: &Match) -> Result<(), NotifyError> {
            self.notified.lock().await.push(matched.clone());
            Ok(())
        }
    }

    struct FlakyNotifier {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl HuddleNotifier for FlakyNotifier {
        async fn notify_match(&self, _matched: &Match) -> Result<(), NotifyError> {
            let mut calls = self.calls.lock().await;
            *calls += 1;
            if *calls == 1 {
                Err(NotifyError::ChannelSetup("conversations.create denied".to_owned()))
            } else {
                Ok(())
            }
        }
    }

    /// Delegates to an in-memory store but refuses every delete, so the
    /// reaper fails while scans keep working.
    struct DeleteRefusingRepository {
        inner: InMemoryAvailabilityRepository,
    }

    #[async_trait]
    impl AvailabilityRepository for DeleteRefusingRepository {
        async fn get(
            &self,
            user_id: &str,
            slot: &AvailabilitySlot,
        ) -> Result<Option<AvailabilityRecord>, StorageError> {
            self.inner.get(user_id, slot).await
        }

        async fn put(&self, record: AvailabilityRecord) -> Result<(), StorageError> {
            self.inner.put(record).await
        }

        async fn query_by_user(
            &self,
            user_id: &str,
        ) -> Result<Vec<AvailabilityRecord>, StorageError> {
            self.inner.query_by_user(user_id).await
        }

        async fn scan_all(&self) -> Result<Vec<AvailabilityRecord>, StorageError> {
            self.inner.scan_all().await
        }

        async fn delete(
            &self,
            _user_id: &str,
            _slot: &AvailabilitySlot,
        ) -> Result<(), StorageError> {
            Err(StorageError::Backend("deletes disabled".to_owned()))
        }
    }

    fn record(user_id: &str, slot_key: &str) -> AvailabilityRecord {
        AvailabilityRecord {
            user_id: user_id.to_string(),
            slot: AvailabilitySlot(slot_key.to_string()),
            channel_id: "C1".to_string(),
            created_at: Utc::now(),
        }
    }

    async fn seed(repository: &dyn AvailabilityRepository, records: Vec<AvailabilityRecord>) {
        for entry in records {
            repository.put(entry).await.expect("seed");
        }
    }

    #[tokio::test]
    async fn run_targets_the_nearest_half_hour_and_notifies_groups() {
        let repository = Arc::new(InMemoryAvailabilityRepository::new());
        seed(
            repository.as_ref(),
            vec![
                record("U1", "2024-01-02T10:00"),
                record("U2", "2024-01-02T10:00"),
                record("U3", "2024-01-02T10:30"),
            ],
        )
        .await;

        // 10:14 rounds down to the 10:00 slot.
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 2, 10, 14, 0).unwrap()));
        let notifier = Arc::new(RecordingNotifier::default());
        let orchestrator = MatchingOrchestrator::new(
            MatchEngine::new(repository, clock.clone(), DEFAULT_MAX_USERS_PER_MATCH),
            notifier.clone(),
            clock,
            DEFAULT_MIN_USERS_PER_HUDDLE,
        );

        let report = orchestrator.run("corr-1").await.expect("run");

        assert_eq!(report.target.as_str(), "2024-01-02T10:00");
        assert_eq!(report.groups, 1);
        assert_eq!(report.notified, 1);

        let notified = notifier.notified.lock().await;
        assert_eq!(notified.len(), 1);
        assert_eq!(notified[0].users, vec!["U1", "U2"]);
    }

    #[tokio::test]
    async fn singleton_groups_are_grouped_but_not_notified() {
        let repository = Arc::new(InMemoryAvailabilityRepository::new());
        seed(repository.as_ref(), vec![record("U1", "2024-01-02T10:00")]).await;

        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()));
        let notifier = Arc::new(RecordingNotifier::default());
        let orchestrator = MatchingOrchestrator::new(
            MatchEngine::new(repository, clock.clone(), DEFAULT_MAX_USERS_PER_MATCH),
            notifier.clone(),
            clock,
            DEFAULT_MIN_USERS_PER_HUDDLE,
        );

        let report = orchestrator.run("corr-2").await.expect("run");

        assert_eq!(report.groups, 1);
        assert_eq!(report.notified, 0);
        assert!(notifier.notified.lock().await.is_empty());
    }

    #[tokio::test]
    async fn run_reaps_stale_records_before_grouping() {
        let repository = Arc::new(InMemoryAvailabilityRepository::new());
        seed(
            repository.as_ref(),
            vec![
                record("U1", "2024-01-02T08:00"),
                record("U2", "2024-01-02T10:00"),
                record("U3", "2024-01-02T10:00"),
            ],
        )
        .await;

        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()));
        let orchestrator = MatchingOrchestrator::new(
            MatchEngine::new(repository.clone(), clock.clone(), DEFAULT_MAX_USERS_PER_MATCH),
            Arc::new(RecordingNotifier::default()),
            clock,
            DEFAULT_MIN_USERS_PER_HUDDLE,
        );

        let report = orchestrator.run("corr-3").await.expect("run");

        assert_eq!(report.reaped, 1);
        assert_eq!(repository.scan_all().await.expect("scan").len(), 2);
    }

    #[tokio::test]
    async fn reap_failure_does_not_abort_the_matching_pass() {
        let inner = InMemoryAvailabilityRepository::new();
        seed(
            &inner,
            vec![
                record("U1", "2024-01-02T08:00"),
                record("U2", "2024-01-02T10:00"),
                record("U3", "2024-01-02T10:00"),
            ],
        )
        .await;
        let repository = Arc::new(DeleteRefusingRepository { inner });

        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()));
        let notifier = Arc::new(RecordingNotifier::default());
        let orchestrator = MatchingOrchestrator::new(
            MatchEngine::new(repository, clock.clone(), DEFAULT_MAX_USERS_PER_MATCH),
            notifier.clone(),
            clock,
            DEFAULT_MIN_USERS_PER_HUDDLE,
        );

        let report = orchestrator.run("corr-4").await.expect("run");

        assert_eq!(report.reaped, 0);
        assert_eq!(report.notified, 1);
        assert_eq!(notifier.notified.lock().await[0].users, vec!["U2", "U3"]);
    }

    #[tokio::test]
    async fn one_failed_notification_does_not_block_the_rest() {
        let repository = Arc::new(InMemoryAvailabilityRepository::new());
        let records = (1..=7).map(|n| record(&format!("U{n}"), "2024-01-02T10:00")).collect();
        seed(repository.as_ref(), records).await;

        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()));
        let orchestrator = MatchingOrchestrator::new(
            MatchEngine::new(repository, clock.clone(), DEFAULT_MAX_USERS_PER_MATCH),
            Arc::new(FlakyNotifier { calls: Mutex::new(0) }),
            clock,
            DEFAULT_MIN_USERS_PER_HUDDLE,
        );

        let report = orchestrator.run("corr-5").await.expect("run");

        // 7 users split 5 + 2; the first notification fails, the second lands.
        assert_eq!(report.groups, 2);
        assert_eq!(report.notified, 1);
    }
}
