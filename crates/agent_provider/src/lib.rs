//! Provider-neutral contract for remote computer-use agent episodes.
//!
//! This crate defines the conversation shapes exchanged with the remote agent,
//! the episode and instance-status interfaces the aggregator consumes, and the
//! shared cancellation signal. It excludes transport details and transcript
//! folding.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

mod cancel;
mod instance;
mod message;

pub use cancel::{CancelReason, CancelSignal};
pub use instance::{InstanceInfo, InstanceStatus, InstanceType, StartedInstance};
pub use message::{Message, Part, Role, StepRecord, ToolOutput};

/// Message the remote collaborator reports when an in-flight call was aborted
/// on purpose. Never surfaced as an error.
pub const USER_ABORT_MESSAGE: &str = "The user aborted a request";

// Placeholder prompt text per provider and instance type; deployments are
// expected to substitute their own wording.
pub const UBUNTU_SYSTEM_PROMPT_ANTHROPIC: &str = "You have access to an Ubuntu VM with internet \
connectivity. Use the computer, bash and str_replace_editor tools to act. Take a screenshot \
after every action that changes the screen and verify the result before continuing.";
pub const BROWSER_SYSTEM_PROMPT_ANTHROPIC: &str = "You have access to a Chromium browser with \
internet connectivity. Use the computer tool to act and take a screenshot after every action \
that changes the page.";
pub const UBUNTU_SYSTEM_PROMPT_OPENAI: &str = "You control an Ubuntu desktop through the computer, \
bash and str_replace_editor tools. Prefer keyboard shortcuts, confirm each step visually and \
stop to ask when the task is ambiguous.";
pub const BROWSER_SYSTEM_PROMPT_OPENAI: &str = "You control a Chromium browser through the \
computer tool. Confirm each step visually and stop to ask when the task is ambiguous.";

/// Error returned while constructing/configuring a provider before any episode starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Tool exposed to the remote model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

impl ToolDefinition {
    #[must_use]
    pub fn computer() -> Self {
        Self {
            name: "computer".to_string(),
            description: Some("Mouse, keyboard and screenshot control".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": { "action": { "type": "string" } },
                "required": ["action"]
            }),
        }
    }

    #[must_use]
    pub fn bash() -> Self {
        Self {
            name: "bash".to_string(),
            description: Some("Run a shell command".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": { "command": { "type": "string" } },
                "required": ["command"]
            }),
        }
    }

    #[must_use]
    pub fn edit() -> Self {
        Self {
            name: "str_replace_editor".to_string(),
            description: Some("View and edit files".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string" },
                    "path": { "type": "string" }
                },
                "required": ["command", "path"]
            }),
        }
    }

    /// Tool set available on an instance type.
    #[must_use]
    pub fn for_instance(instance_type: InstanceType) -> Vec<Self> {
        match instance_type {
            InstanceType::Ubuntu => vec![Self::computer(), Self::bash(), Self::edit()],
            InstanceType::Browser => vec![Self::computer()],
        }
    }
}

/// Prompt family selected from the model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Anthropic,
    OpenAi,
}

impl ModelFamily {
    #[must_use]
    pub fn from_model_name(model_name: &str) -> Self {
        if model_name.trim().to_ascii_lowercase().starts_with("claude") {
            Self::Anthropic
        } else {
            Self::OpenAi
        }
    }

    #[must_use]
    pub fn system_prompt(&self, instance_type: InstanceType) -> &'static str {
        match (self, instance_type) {
            (Self::Anthropic, InstanceType::Ubuntu) => UBUNTU_SYSTEM_PROMPT_ANTHROPIC,
            (Self::Anthropic, InstanceType::Browser) => BROWSER_SYSTEM_PROMPT_ANTHROPIC,
            (Self::OpenAi, InstanceType::Ubuntu) => UBUNTU_SYSTEM_PROMPT_OPENAI,
            (Self::OpenAi, InstanceType::Browser) => BROWSER_SYSTEM_PROMPT_OPENAI,
        }
    }
}

/// Callback style the remote runtime reports progress with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStyle {
    /// One delta record per reasoning/acting cycle.
    #[default]
    PerStep,
    /// Fully-shaped assistant and tool messages.
    PerMessage,
}

/// Input required to run one agent episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRequest {
    pub model: String,
    pub system: String,
    pub tools: Vec<ToolDefinition>,
    pub messages: Vec<Message>,
    pub style: CallbackStyle,
}

impl EpisodeRequest {
    /// Builds a request with the tool set of `instance_type` and the system
    /// prompt matching the model family.
    #[must_use]
    pub fn for_instance(
        model: impl Into<String>,
        instance_type: InstanceType,
        messages: Vec<Message>,
        style: CallbackStyle,
    ) -> Self {
        let model = model.into();
        let system = ModelFamily::from_model_name(&model)
            .system_prompt(instance_type)
            .to_string();

        Self {
            model,
            system,
            tools: ToolDefinition::for_instance(instance_type),
            messages,
            style,
        }
    }
}

/// Progress reported by the runtime while an episode runs.
#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeEvent {
    Step(StepRecord),
    AssistantMessage(Message),
    ToolMessage(Message),
}

impl EpisodeEvent {
    /// JSON shape of the event as it travels on the wire.
    pub fn to_record(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Step(step) => serde_json::to_value(step),
            Self::AssistantMessage(message) | Self::ToolMessage(message) => {
                serde_json::to_value(message)
            }
        }
    }

    pub fn is_step(&self) -> bool {
        matches!(self, Self::Step(_))
    }
}

/// Immutable metadata describing a runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// Remote agent runtime executing one episode at a time.
pub trait AgentRuntime: Send + Sync + 'static {
    fn profile(&self) -> ProviderProfile;

    /// Runs an episode to completion, reporting progress through `emit` in the
    /// style named by `req.style`.
    ///
    /// Implementations must stop promptly once `cancel` is cancelled and return
    /// `Err(USER_ABORT_MESSAGE)` in that case.
    fn run_episode(
        &self,
        req: EpisodeRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(EpisodeEvent),
    ) -> Result<(), String>;
}

/// Out-of-band status query against a remote instance.
pub trait InstanceMonitor: Send + Sync + 'static {
    fn instance(&self, instance_id: &str) -> Result<InstanceInfo, String>;
}
