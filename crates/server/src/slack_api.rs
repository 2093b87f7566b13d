//! Slack Web API client used on the egress path.
//!
//! The socket layer only receives; everything the bot says goes out through
//! here. The client doubles as the huddle notifier: for each matched group
//! it creates a channel, invites the members, and posts the announcement.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use huddlematch_core::domain::{AvailabilitySlot, Match};
use huddlematch_slack::blocks::{match_notification_message, MessageTemplate};
use huddlematch_slack::huddles::{HuddleNotifier, NotifyError};
use huddlematch_slack::socket::{DeliveryError, ResponseDelivery};

const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("slack api transport failure calling {method}: {source}")]
    Transport { method: &'static str, source: reqwest::Error },
    #[error("slack api call {method} failed: {error}")]
    Api { method: &'static str, error: String },
    #[error("slack api call {method} returned an unexpected payload")]
    Payload { method: &'static str },
}

pub struct SlackApiClient {
    http: Client,
    bot_token: SecretString,
    base_url: String,
    huddle_name_prefix: String,
}

impl SlackApiClient {
    pub fn new(bot_token: &str, huddle_name_prefix: &str) -> Self {
        Self {
            http: Client::new(),
            bot_token: bot_token.to_owned().into(),
            base_url: SLACK_API_BASE.to_owned(),
            huddle_name_prefix: huddle_name_prefix.to_owned(),
        }
    }

    async fn call(&self, method: &'static str, payload: Value) -> Result<Value, SlackApiError> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|source| SlackApiError::Transport { method, source })?;

        let body: Value = response
            .json()
            .await
            .map_err(|source| SlackApiError::Transport { method, source })?;
        check_ok(method, body)
    }

    pub async fn post_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        self.call(
            "chat.postMessage",
            json!({
                "channel": channel_id,
                "text": message.fallback_text,
                "blocks": message.blocks,
            }),
        )
        .await
        .map(|_| ())
    }

    pub async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        self.call(
            "chat.postEphemeral",
            json!({
                "channel": channel_id,
                "user": user_id,
                "text": message.fallback_text,
                "blocks": message.blocks,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn create_huddle_channel(&self, name: &str) -> Result<String, SlackApiError> {
        let body = self.call("conversations.create", create_channel_payload(name)).await?;
        body.pointer("/channel/id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(SlackApiError::Payload { method: "conversations.create" })
    }

    async fn invite_members(
        &self,
        channel_id: &str,
        user_ids: &[String],
    ) -> Result<(), SlackApiError> {
        self.call(
            "conversations.invite",
            json!({ "channel": channel_id, "users": user_ids.join(",") }),
        )
        .await
        .map(|_| ())
    }
}

/// Slack channel names allow lowercase alphanumerics and dashes, so the
/// slot key collapses to its digits: `2024-01-02T10:00` with prefix
/// `huddle-` and suffix `ab12cd` becomes `huddle-202401021000-ab12cd`.
fn huddle_channel_name(prefix: &str, slot: &AvailabilitySlot, suffix: &str) -> String {
    let digits: String = slot.as_str().chars().filter(|ch| ch.is_ascii_digit()).collect();
    format!("{prefix}{digits}-{suffix}")
}

/// Huddle channels are private so only invited members see them.
fn create_channel_payload(name: &str) -> Value {
    json!({ "name": name, "is_private": true })
}

fn check_ok(method: &'static str, body: Value) -> Result<Value, SlackApiError> {
    if body.get("ok").and_then(Value::as_bool) != Some(true) {
        let error =
            body.get("error").and_then(Value::as_str).unwrap_or("unknown_error").to_owned();
        return Err(SlackApiError::Api { method, error });
    }
    Ok(body)
}

/// Command replies go out as ephemeral messages so only the requester
/// sees them in the channel they typed the command in.
#[async_trait]
impl ResponseDelivery for SlackApiClient {
    async fn deliver(
        &self,
        channel_id: &str,
        user_id: &str,
        message: &MessageTemplate,
    ) -> Result<(), DeliveryError> {
        self.post_ephemeral(channel_id, user_id, message)
            .await
            .map_err(|error| DeliveryError(error.to_string()))
    }
}

#[async_trait]
impl HuddleNotifier for SlackApiClient {
    async fn notify_match(&self, matched: &Match) -> Result<(), NotifyError> {
        // The random suffix keeps repeated runs for the same slot from
        // colliding on the workspace-unique channel name.
        let suffix = Uuid::new_v4().simple().to_string();
        let name = huddle_channel_name(&self.huddle_name_prefix, &matched.slot, &suffix[..6]);

        let channel_id = self
            .create_huddle_channel(&name)
            .await
            .map_err(|error| NotifyError::ChannelSetup(error.to_string()))?;
        self.invite_members(&channel_id, &matched.users)
            .await
            .map_err(|error| NotifyError::ChannelSetup(error.to_string()))?;

        let message = match_notification_message(
            matched.slot.date(),
            &matched.slot.display_range(),
            &matched.users,
        );
        self.post_message(&channel_id, &message)
            .await
            .map_err(|error| NotifyError::Delivery(error.to_string()))?;

        info!(
            event_name = "egress.slack.huddle_created",
            channel = %name,
            slot = %matched.slot,
            users = matched.len(),
            "huddle channel created and announced"
        );
        Ok(())
    }
}
