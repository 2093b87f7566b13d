use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use huddlematch_core::clock::Clock;
use huddlematch_core::domain::{AvailabilityRecord, AvailabilitySlot};
use huddlematch_core::repository::StorageError;
use huddlematch_core::scheduler::Scheduler;
use huddlematch_core::timerange::{parse_time_range, AdmissionWindow};

use crate::blocks::{self, MessageTemplate};
use crate::commands::{AvailabilityCommandService, CommandEnvelope, CommandRouteError};

/// The real `/huddle` command service, backed by the availability store.
///
/// Registration entries are validated one at a time: a malformed date or
/// range produces a per-entry failure line in the response while the
/// remaining entries still go through. Only storage failures abort the
/// whole command.
pub struct SchedulerCommandService {
    scheduler: Scheduler,
    window: AdmissionWindow,
    clock: Arc<dyn Clock>,
}

impl SchedulerCommandService {
    pub fn new(scheduler: Scheduler, window: AdmissionWindow, clock: Arc<dyn Clock>) -> Self {
        Self { scheduler, window, clock }
    }
}

/// Renders one line per date, ranges in chronological order, for records
/// already sorted by slot key: `2024-01-02: 10:00-10:30, 10:30-11:00`.
pub fn format_availability_lines(records: &[AvailabilityRecord]) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for record in records {
        let date = record.slot.date().to_string();
        match &mut current {
            Some((open_date, ranges)) if *open_date == date => {
                ranges.push(record.slot.display_range());
            }
            _ => {
                if let Some((open_date, ranges)) = current.take() {
                    lines.push(format!("{open_date}: {}", ranges.join(", ")));
                }
                current = Some((date, vec![record.slot.display_range()]));
            }
        }
    }
    if let Some((open_date, ranges)) = current {
        lines.push(format!("{open_date}: {}", ranges.join(", ")));
    }
    lines
}

fn split_entry(entry: &str) -> Result<(&str, &str), String> {
    let mut parts = entry.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(date), Some(range), None) => Ok((date, range)),
        _ => Err(format!("invalid entry `{entry}`. Expected `YYYY-MM-DD HH:MM-HH:MM`")),
    }
}

fn storage_failure(error: StorageError) -> CommandRouteError {
    CommandRouteError::Service(error.to_string())
}

#[async_trait]
impl AvailabilityCommandService for SchedulerCommandService {
    async fn register(
        &self,
        entries: &[String],
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        if entries.is_empty() {
            return Ok(blocks::error_message(
                "Nothing to register. Usage: `/huddle register YYYY-MM-DD HH:MM-HH:MM`",
                &envelope.request_id,
            ));
        }

        let now = self.clock.now();
        let mut registered = 0usize;
        let mut duplicates = 0usize;
        let mut failures = Vec::new();

        for entry in entries {
            let (date, range) = match split_entry(entry) {
                Ok(parts) => parts,
                Err(message) => {
                    failures.push(message);
                    continue;
                }
            };
            if let Err(error) = self.window.check(date, now) {
                failures.push(error.to_string());
                continue;
            }
            let slots = match parse_time_range(date, range) {
                Ok(slots) => slots,
                Err(error) => {
                    failures.push(error.to_string());
                    continue;
                }
            };

            for slot in &slots {
                let written = self
                    .scheduler
                    .register_availability(&envelope.user_id, slot, &envelope.channel_id)
                    .await
                    .map_err(storage_failure)?;
                if written {
                    registered += 1;
                } else {
                    duplicates += 1;
                }
            }
        }

        debug!(
            user_id = %envelope.user_id,
            registered,
            duplicates,
            failures = failures.len(),
            "processed register command"
        );
        Ok(blocks::registration_summary_message(registered, duplicates, &failures))
    }

    async fn list(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let records = self
            .scheduler
            .list_availabilities(&envelope.user_id)
            .await
            .map_err(storage_failure)?;
        Ok(blocks::availability_list_message(&format_availability_lines(&records)))
    }

    async fn delete(
        &self,
        entries: &[String],
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        if entries.is_empty() {
            return Ok(blocks::error_message(
                "Nothing to delete. Usage: `/huddle delete YYYY-MM-DD HH:MM-HH:MM` or `/huddle delete all`",
                &envelope.request_id,
            ));
        }

        let mut targets: Vec<AvailabilitySlot> = Vec::new();
        let mut failures = Vec::new();

        // No admission window here: stale in-window checks would strand
        // records the user can no longer remove.
        for entry in entries {
            let (date, range) = match split_entry(entry) {
                Ok(parts) => parts,
                Err(message) => {
                    failures.push(message);
                    continue;
                }
            };
            match parse_time_range(date, range) {
                Ok(slots) => targets.extend(slots),
                Err(error) => failures.push(error.to_string()),
            }
        }

        self.scheduler
            .delete_slots(&envelope.user_id, &targets)
            .await
            .map_err(storage_failure)?;
        Ok(blocks::deletion_summary_message(targets.len(), &failures))
    }

    async fn delete_all(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let removed = self
            .scheduler
            .delete_all_user_availabilities(&envelope.user_id)
            .await
            .map_err(storage_failure)?;
        Ok(blocks::deletion_summary_message(removed, &[]))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use huddlematch_core::clock::FixedClock;
    use huddlematch_core::scheduler::Scheduler;
    use huddlematch_core::timerange::AdmissionWindow;
    use huddlematch_db::InMemoryAvailabilityRepository;

    use crate::blocks::{Block, TextObject};
    use crate::commands::{AvailabilityCommandService, CommandEnvelope, CommandRouter};

    use super::SchedulerCommandService;

    fn service() -> SchedulerCommandService {
        let repository = Arc::new(InMemoryAvailabilityRepository::new());
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()));
        SchedulerCommandService::new(
            Scheduler::new(repository, clock.clone()),
            AdmissionWindow::default(),
            clock,
        )
    }

    fn envelope(verb: &str) -> CommandEnvelope {
        CommandEnvelope {
            command: "huddle".to_owned(),
            verb: verb.to_owned(),
            freeform_args: String::new(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            trigger_ts: "1".to_owned(),
            request_id: format!("req-{verb}"),
        }
    }

    fn section_text(message: &crate::blocks::MessageTemplate, index: usize) -> String {
        match &message.blocks[index] {
            Block::Section { text: TextObject::Mrkdwn { text }, .. }
            | Block::Section { text: TextObject::Plain { text }, .. } => text.clone(),
            other => panic!("expected section block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_then_list_renders_grouped_ranges() {
        let service = service();
        let entries =
            vec!["2024-01-02 10:00-11:00".to_owned(), "2024-01-03 14:00-14:30".to_owned()];

        let summary = service.register(&entries, &envelope("register")).await.expect("register");
        assert_eq!(summary.fallback_text, "Registered 3 slot(s).");

        let listed = service.list(&envelope("list")).await.expect("list");
        let body = section_text(&listed, 1);
        assert!(body.contains("2024-01-02: 10:00-10:30, 10:30-11:00"));
        assert!(body.contains("2024-01-03: 14:00-14:30"));
    }

    #[tokio::test]
    async fn re_registering_reports_duplicates_instead_of_failing() {
        let service = service();
        let entries = vec!["2024-01-02 10:00-11:00".to_owned()];

        service.register(&entries, &envelope("register")).await.expect("first");
        let second = service.register(&entries, &envelope("register")).await.expect("second");

        assert!(second.fallback_text.contains("Registered 0 slot(s)"));
        assert!(second.fallback_text.contains("skipped 2 already-registered"));
    }

    #[tokio::test]
    async fn one_bad_entry_does_not_block_the_others() {
        let service = service();
        let entries = vec![
            "2024-01-02 10:00-11:00".to_owned(),
            "2024-01-02 15:00-13:00".to_owned(),
            "not-an-entry".to_owned(),
        ];

        let summary = service.register(&entries, &envelope("register")).await.expect("register");

        assert!(summary.fallback_text.contains("Registered 2 slot(s)"));
        let failures = section_text(&summary, 1);
        assert!(failures.contains("15:00-13:00"));
        assert!(failures.contains("not-an-entry"));
    }

    #[tokio::test]
    async fn out_of_window_dates_are_rejected_with_the_date_echoed() {
        let service = service();
        let entries = vec!["2024-03-01 10:00-10:30".to_owned()];

        let summary = service.register(&entries, &envelope("register")).await.expect("register");

        assert!(summary.fallback_text.contains("Registered 0 slot(s)"));
        let failures = section_text(&summary, 1);
        assert!(failures.contains("2024-03-01"));
        assert!(failures.contains("14-day"));
    }

    #[tokio::test]
    async fn empty_register_returns_usage_guidance() {
        let service = service();
        let message = service.register(&[], &envelope("register")).await.expect("register");
        assert!(message.fallback_text.contains("Nothing to register"));
    }

    #[tokio::test]
    async fn delete_removes_the_named_range_only() {
        let service = service();
        service
            .register(
                &["2024-01-02 10:00-11:00".to_owned(), "2024-01-03 14:00-14:30".to_owned()],
                &envelope("register"),
            )
            .await
            .expect("register");

        let deleted = service
            .delete(&["2024-01-02 10:00-11:00".to_owned()], &envelope("delete"))
            .await
            .expect("delete");
        assert!(deleted.fallback_text.contains("Removed 2 slot(s)"));

        let listed = service.list(&envelope("list")).await.expect("list");
        let body = section_text(&listed, 1);
        assert!(!body.contains("2024-01-02"));
        assert!(body.contains("2024-01-03: 14:00-14:30"));
    }

    #[tokio::test]
    async fn bare_delete_keeps_records_and_returns_usage_guidance() {
        let service = service();
        service
            .register(&["2024-01-02 10:00-11:00".to_owned()], &envelope("register"))
            .await
            .expect("register");

        // A `/huddle delete` with no arguments must not fall through to the
        // delete-all path.
        let router = CommandRouter::new(service);
        let reply = router.route(envelope("delete")).await.expect("route");
        assert!(reply.fallback_text.contains("Nothing to delete"));
        assert!(!reply.fallback_text.contains("Removed"));

        let listed = router.route(envelope("list")).await.expect("list");
        let body = section_text(&listed, 1);
        assert!(body.contains("2024-01-02: 10:00-10:30, 10:30-11:00"));
    }

    #[tokio::test]
    async fn delete_all_reports_the_removed_count() {
        let service = service();
        service
            .register(&["2024-01-02 10:00-11:30".to_owned()], &envelope("register"))
            .await
            .expect("register");

        let message = service.delete_all(&envelope("delete")).await.expect("delete all");
        assert!(message.fallback_text.contains("Removed 3 slot(s)"));

        let empty = service.list(&envelope("list")).await.expect("list");
        assert_eq!(section_text(&empty, 0), "You have no registered availability. Try `/huddle register YYYY-MM-DD HH:MM-HH:MM`.");
    }
}
