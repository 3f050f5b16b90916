//! Conversation shapes shared by the wire protocol, the remote runtime and the
//! transcript.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// One conversation turn. Content order is significant and preserved as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: Vec<Part>) -> Self {
        Self {
            role,
            content,
            response_id: None,
        }
    }

    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    #[must_use]
    pub fn assistant(content: Vec<Part>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub fn tool(content: Vec<Part>) -> Self {
        Self::new(Role::Tool, content)
    }

    #[must_use]
    pub fn with_response_id(mut self, response_id: Option<String>) -> Self {
        self.response_id = response_id;
        self
    }

    /// Concatenated `text` parts, ignoring every other variant.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Typed fragment of a message, keyed on the wire by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text {
        #[serde(default)]
        text: String,
    },
    Reasoning {
        #[serde(default)]
        reasoning: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        instructions: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        #[serde(default)]
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        #[serde(default)]
        tool_call_id: String,
        #[serde(default)]
        tool_name: String,
        #[serde(default)]
        result: ToolOutput,
        #[serde(default, skip_serializing_if = "is_false")]
        is_error: bool,
    },
}

impl Part {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn reasoning(reasoning: impl Into<String>) -> Self {
        Self::Reasoning {
            reasoning: reasoning.into(),
            signature: None,
            instructions: None,
        }
    }

    #[must_use]
    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: Map<String, Value>,
    ) -> Self {
        Self::ToolCall {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
        }
    }

    #[must_use]
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: ToolOutput,
    ) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            result,
            is_error: false,
        }
    }

    pub fn tool_output(&self) -> Option<&ToolOutput> {
        match self {
            Self::ToolResult { result, .. } => Some(result),
            Self::Text { .. } | Self::Reasoning { .. } | Self::ToolCall { .. } => None,
        }
    }

    pub fn tool_output_mut(&mut self) -> Option<&mut ToolOutput> {
        match self {
            Self::ToolResult { result, .. } => Some(result),
            Self::Text { .. } | Self::Reasoning { .. } | Self::ToolCall { .. } => None,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Payload of a tool result. Fields the aggregator does not model are kept in
/// `extra` so a record can be forwarded without loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Base64-encoded screenshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolOutput {
    #[must_use]
    pub fn output(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_image(mut self, base64_image: impl Into<String>) -> Self {
        self.base64_image = Some(base64_image.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn has_image(&self) -> bool {
        self.base64_image
            .as_deref()
            .is_some_and(|image| !image.is_empty())
    }

    /// Removes the image payload, returning it when one was present.
    pub fn take_image(&mut self) -> Option<String> {
        self.base64_image.take()
    }

    /// True when there is nothing textual to show for this result.
    pub fn is_blank(&self) -> bool {
        [&self.output, &self.system, &self.error]
            .iter()
            .all(|field| field.as_deref().map_or(true, str::is_empty))
    }
}

/// Delta describing one reasoning/acting cycle of the remote agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_parts: Option<Vec<Part>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Part>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<Part>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepRecord {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_response_id(mut self, response_id: impl Into<String>) -> Self {
        self.response_id = Some(response_id.into());
        self
    }

    #[must_use]
    pub fn with_reasoning(mut self, parts: Vec<Part>) -> Self {
        self.reasoning_parts = Some(parts);
        self
    }

    #[must_use]
    pub fn with_tool_calls(mut self, parts: Vec<Part>) -> Self {
        self.tool_calls = Some(parts);
        self
    }

    #[must_use]
    pub fn with_tool_results(mut self, parts: Vec<Part>) -> Self {
        self.tool_results = Some(parts);
        self
    }
}
