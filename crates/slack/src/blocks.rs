use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

pub fn registration_summary_message(
    registered: usize,
    duplicates: usize,
    failures: &[String],
) -> MessageTemplate {
    let mut summary = format!("Registered {registered} slot(s)");
    if duplicates > 0 {
        summary.push_str(&format!(", skipped {duplicates} already-registered slot(s)"));
    }
    summary.push('.');

    let mut builder = MessageBuilder::new(summary.clone())
        .section("huddle.register.summary.v1", |section| {
            section.mrkdwn(format!(":calendar: {summary}"));
        });

    if !failures.is_empty() {
        let lines =
            failures.iter().map(|failure| format!("• {failure}")).collect::<Vec<_>>().join("\n");
        builder = builder.section("huddle.register.failures.v1", |section| {
            section.mrkdwn(format!("*Entries that could not be registered*\n{lines}"));
        });
    }

    builder.build()
}

pub fn availability_list_message(lines: &[String]) -> MessageTemplate {
    if lines.is_empty() {
        return MessageBuilder::new("No availability registered")
            .section("huddle.list.empty.v1", |section| {
                section.plain(
                    "You have no registered availability. Try `/huddle register YYYY-MM-DD HH:MM-HH:MM`.",
                );
            })
            .build();
    }

    let body = lines.iter().map(|line| format!("• {line}")).collect::<Vec<_>>().join("\n");
    MessageBuilder::new("Your registered availability")
        .section("huddle.list.header.v1", |section| {
            section.mrkdwn("*Your registered availability*");
        })
        .section("huddle.list.entries.v1", |section| {
            section.mrkdwn(body);
        })
        .build()
}

pub fn deletion_summary_message(removed: usize, failures: &[String]) -> MessageTemplate {
    let summary = format!("Removed {removed} slot(s) from your availability.");
    let mut builder = MessageBuilder::new(summary.clone())
        .section("huddle.delete.summary.v1", |section| {
            section.mrkdwn(format!(":wastebasket: {summary}"));
        });

    if !failures.is_empty() {
        let lines =
            failures.iter().map(|failure| format!("• {failure}")).collect::<Vec<_>>().join("\n");
        builder = builder.section("huddle.delete.failures.v1", |section| {
            section.mrkdwn(format!("*Entries that could not be deleted*\n{lines}"));
        });
    }

    builder.build()
}

pub fn match_notification_message(
    date: &str,
    range: &str,
    user_ids: &[String],
) -> MessageTemplate {
    let mentions = user_ids
        .iter()
        .map(|user_id| format!("<@{user_id}>"))
        .collect::<Vec<_>>()
        .join(" ");
    MessageBuilder::new(format!("Huddle match for {date} {range}"))
        .section("huddle.match.header.v1", |section| {
            section.mrkdwn(format!(":coffee: *You are matched for a huddle!*\n{date} {range}"));
        })
        .section("huddle.match.members.v1", |section| {
            section.mrkdwn(format!("Members: {mentions}"));
        })
        .context("huddle.match.context.v1", |context| {
            context.plain("Start a huddle in this channel when the slot begins.");
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("huddle.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("huddle.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("Huddle command help")
        .section("huddle.help.summary.v1", |section| {
            section.mrkdwn(
                "*Available commands*\n• `/huddle register YYYY-MM-DD HH:MM-HH:MM[, ...]`\n• `/huddle list`\n• `/huddle delete YYYY-MM-DD HH:MM-HH:MM[, ...]`\n• `/huddle delete all`\n• `/huddle help`",
            );
        })
        .build()
}
