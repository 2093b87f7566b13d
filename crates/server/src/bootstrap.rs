use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use huddlematch_core::clock::SystemClock;
use huddlematch_core::config::{AppConfig, ConfigError, LoadOptions};
use huddlematch_core::matching::MatchEngine;
use huddlematch_core::scheduler::Scheduler;
use huddlematch_core::timerange::AdmissionWindow;
use huddlematch_db::{connect_with_settings, migrations, DbPool, SqlAvailabilityRepository};
use huddlematch_slack::events::{EventDispatcher, SlashCommandHandler};
use huddlematch_slack::huddles::MatchingOrchestrator;
use huddlematch_slack::service::SchedulerCommandService;
use huddlematch_slack::socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner};

use crate::slack_api::SlackApiClient;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: Arc<MatchingOrchestrator>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let repository = Arc::new(SqlAvailabilityRepository::new(db_pool.clone()));
    let clock = Arc::new(SystemClock);

    let command_service = SchedulerCommandService::new(
        Scheduler::new(repository.clone(), clock.clone()),
        AdmissionWindow::new(config.matching.admission_window_days),
        clock.clone(),
    );
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(command_service));

    // One API client serves both egress paths: command replies and huddle
    // notifications.
    let api_client = Arc::new(SlackApiClient::new(
        config.slack.bot_token.expose_secret(),
        &config.matching.huddle_name_prefix,
    ));
    let orchestrator = Arc::new(MatchingOrchestrator::new(
        MatchEngine::new(repository, clock.clone(), config.matching.max_users_per_match),
        api_client.clone(),
        clock,
        config.matching.min_users_per_huddle,
    ));

    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        dispatcher,
        api_client,
        ReconnectPolicy::default(),
    );

    Ok(Application { config, db_pool, orchestrator, slack_runner })
}

#[cfg(test)]
mod tests {
    use huddlematch_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                slack_app_token: Some("xapp-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_required_slack_tokens() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                slack_app_token: Some("invalid-token".to_string()),
                slack_bot_token: Some("xoxb-valid".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[tokio::test]
    async fn bootstrap_applies_the_availability_schema() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'availability'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected availability table after bootstrap");
        assert_eq!(table_count, 1, "bootstrap should expose the availability table");

        app.db_pool.close().await;
    }
}
