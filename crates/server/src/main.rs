mod bootstrap;
mod cadence;
mod health;
mod slack_api;

use anyhow::Result;
use huddlematch_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use huddlematch_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let cadence_task =
        cadence::spawn(app.orchestrator.clone(), app.config.matching.cadence_secs);

    tracing::info!(
        event_name = "system.server.slack_transport_mode",
        transport_mode = "noop",
        correlation_id = "bootstrap",
        "slack runner transport mode initialized"
    );

    // The runner owns its reconnect loop; it pumps the socket in the
    // background while the server finishes starting up.
    let slack_runner = app.slack_runner;
    let socket_task = tokio::spawn(async move {
        if let Err(error) = slack_runner.start().await {
            tracing::error!(
                event_name = "system.server.socket_runner_failed",
                correlation_id = "runtime",
                error = %error,
                "socket mode runner terminated"
            );
        }
    });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "huddlematch-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "huddlematch-server stopping"
    );
    cadence_task.abort();
    socket_task.abort();

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use huddlematch_slack::events::{EventDispatcher, SlackEnvelope};
    use huddlematch_slack::socket::{
        NoopResponseDelivery, ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError,
    };

    struct IdleTransport;

    #[async_trait]
    impl SocketTransport for IdleTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
            std::future::pending().await
        }

        async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn socket_runner_pumps_in_the_background() {
        let runner = SocketModeRunner::new(
            Arc::new(IdleTransport),
            EventDispatcher::new(),
            Arc::new(NoopResponseDelivery),
            ReconnectPolicy::default(),
        );

        let socket_task = tokio::spawn(async move { runner.start().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(
            !socket_task.is_finished(),
            "an idle socket connection must not run the server loop to completion"
        );
        socket_task.abort();
    }
}
