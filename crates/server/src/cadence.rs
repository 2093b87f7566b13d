use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use huddlematch_slack::huddles::MatchingOrchestrator;

/// Drives the periodic matching run. The first pass fires immediately so a
/// restart never skips the slot it came up in; later passes keep the
/// configured cadence.
pub fn spawn(orchestrator: Arc<MatchingOrchestrator>, cadence_secs: u64) -> JoinHandle<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(cadence_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            let correlation_id = Uuid::new_v4().to_string();

            match orchestrator.run(&correlation_id).await {
                Ok(report) => {
                    info!(
                        event_name = "matching.cadence_tick",
                        correlation_id = %correlation_id,
                        target = %report.target,
                        reaped = report.reaped,
                        groups = report.groups,
                        notified = report.notified,
                        "scheduled matching run finished"
                    );
                }
                Err(error) => {
                    warn!(
                        event_name = "matching.cadence_tick_failed",
                        correlation_id = %correlation_id,
                        error = %error,
                        "scheduled matching run failed; next tick will retry"
                    );
                }
            }
        }
    })
}
