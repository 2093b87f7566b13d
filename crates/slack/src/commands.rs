use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::{self, MessageTemplate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: String,
    pub verb: String,
    pub freeform_args: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

/// The `/huddle` verbs. `Register` and `Delete` carry the raw
/// comma-separated `YYYY-MM-DD HH:MM-HH:MM` entries; validation happens in
/// the command service so one malformed entry never blocks the others.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HuddleCommand {
    Register { entries: Vec<String> },
    List,
    Delete { entries: Vec<String> },
    DeleteAll,
    Help,
    Unknown { verb: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn normalize_huddle_command(
    payload: SlashCommandPayload,
) -> Result<CommandEnvelope, CommandParseError> {
    if payload.command != "/huddle" {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let text = payload.text.trim().to_owned();
    let mut parts = text.split_whitespace();
    let verb = parts.next().unwrap_or("help").to_ascii_lowercase();
    let freeform_args = parts.collect::<Vec<_>>().join(" ");

    Ok(CommandEnvelope {
        command: "huddle".to_owned(),
        verb,
        freeform_args,
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        trigger_ts: payload.trigger_ts,
        request_id: payload.request_id,
    })
}

pub fn parse_huddle_command(input: &str) -> HuddleCommand {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return HuddleCommand::Help;
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    let freeform_args = parts.collect::<Vec<_>>().join(" ");
    classify_huddle_command(&verb, freeform_args)
}

fn classify_huddle_command(verb: &str, freeform_args: String) -> HuddleCommand {
    match verb {
        "register" => HuddleCommand::Register { entries: split_entries(&freeform_args) },
        "list" => HuddleCommand::List,
        "delete" => {
            // Wiping everything takes an explicit `all`; a bare `delete`
            // falls through as an empty entry list and gets a usage error.
            if freeform_args.trim().eq_ignore_ascii_case("all") {
                HuddleCommand::DeleteAll
            } else {
                HuddleCommand::Delete { entries: split_entries(&freeform_args) }
            }
        }
        "help" | "" => HuddleCommand::Help,
        _ => HuddleCommand::Unknown { verb: verb.to_owned() },
    }
}

/// Splits `a, b, c` into trimmed non-empty segments.
fn split_entries(args: &str) -> Vec<String> {
    args.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect()
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: AvailabilityCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        envelope: CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match classify_huddle_command(&envelope.verb, envelope.freeform_args.clone()) {
            HuddleCommand::Register { entries } => {
                self.service.register(&entries, &envelope).await
            }
            HuddleCommand::List => self.service.list(&envelope).await,
            HuddleCommand::Delete { entries } => self.service.delete(&entries, &envelope).await,
            HuddleCommand::DeleteAll => self.service.delete_all(&envelope).await,
            HuddleCommand::Help => Ok(blocks::help_message()),
            HuddleCommand::Unknown { verb } => Ok(blocks::error_message(
                &format!("Unsupported command `/huddle {verb}`. Try `/huddle help`."),
                &envelope.request_id,
            )),
        }
    }
}

#[async_trait]
pub trait AvailabilityCommandService: Send + Sync {
    async fn register(
        &self,
        entries: &[String],
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn list(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn delete(
        &self,
        entries: &[String],
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn delete_all(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError>;
}

#[derive(Default)]
pub struct NoopAvailabilityCommandService;

#[async_trait]
impl AvailabilityCommandService for NoopAvailabilityCommandService {
    async fn register(
        &self,
        entries: &[String],
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::registration_summary_message(entries.len(), 0, &[]))
    }

    async fn list(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::availability_list_message(&[]))
    }

    async fn delete(
        &self,
        entries: &[String],
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::deletion_summary_message(entries.len(), &[]))
    }

    async fn delete_all(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        Ok(blocks::deletion_summary_message(0, &[]))
    }
}
