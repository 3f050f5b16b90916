//! Folding of payload records into transcript messages.

use std::fmt;
use std::str::FromStr;

use agent_provider::{Message, Part, Role, StepRecord};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Shape of the payload records a session ingests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IngestMode {
    /// One delta record per reasoning/acting cycle.
    #[default]
    Step,
    /// Records already shaped as assistant or tool messages.
    Message,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Message => "message",
        }
    }

    /// The fold function for this mode. Chosen once per session.
    pub fn fold_fn(self) -> FoldFn {
        match self {
            Self::Step => fold_step_value,
            Self::Message => fold_message_value,
        }
    }
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "step" | "steps" => Ok(Self::Step),
            "message" | "messages" => Ok(Self::Message),
            other => Err(format!("unknown ingest mode '{other}' (expected step or message)")),
        }
    }
}

/// Decodes one payload record and folds it into zero or more messages.
pub type FoldFn = fn(&Value) -> Result<Vec<Message>, serde_json::Error>;

/// Folds one step record: at most an assistant message followed by a tool
/// message.
///
/// The assistant message is `reasoningParts ++ [text] ++ toolCalls` and is only
/// produced when the text is non-empty or there is reasoning or a tool call.
pub fn fold_step_record(record: StepRecord) -> Vec<Message> {
    let StepRecord {
        response_id,
        text,
        reasoning_parts,
        tool_calls,
        tool_results,
        error: _,
    } = record;

    let reasoning = reasoning_parts.unwrap_or_default();
    let calls = tool_calls.unwrap_or_default();
    let text = text.unwrap_or_default();

    let mut messages = Vec::with_capacity(2);

    if !text.is_empty() || !reasoning.is_empty() || !calls.is_empty() {
        let mut content = Vec::with_capacity(reasoning.len() + 1 + calls.len());
        content.extend(reasoning);
        content.push(Part::text(text));
        content.extend(calls);
        messages.push(Message::new(Role::Assistant, content).with_response_id(response_id));
    }

    if let Some(results) = tool_results {
        messages.push(Message::tool(results));
    }

    messages
}

/// Folds one message record. Assistant and tool messages pass through as-is;
/// user messages are never taken from the stream.
pub fn fold_message_record(message: Message) -> Vec<Message> {
    match message.role {
        Role::Assistant | Role::Tool => vec![message],
        Role::User => Vec::new(),
    }
}

fn fold_step_value(value: &Value) -> Result<Vec<Message>, serde_json::Error> {
    let record = StepRecord::deserialize(value)?;
    if let Some(error) = record.error.as_deref().filter(|error| !error.is_empty()) {
        warn!(error, "step record carried an error next to its payload");
    }
    Ok(fold_step_record(record))
}

fn fold_message_value(value: &Value) -> Result<Vec<Message>, serde_json::Error> {
    Message::deserialize(value).map(fold_message_record)
}

/// Ordered conversation owned by a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Mutable view for in-place redaction. The message list itself cannot grow
    /// or shrink through this handle.
    pub fn messages_mut(&mut self) -> &mut [Message] {
        &mut self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.clone()
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
