use serde_json::{Map, Value};

/// Fields whose presence marks a record as a step or message payload.
const PAYLOAD_FIELDS: [&str; 7] = [
    "role",
    "content",
    "responseId",
    "text",
    "reasoningParts",
    "toolCalls",
    "toolResults",
];

/// Known category of a business error reported inline in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The account ran out of agent execution credits.
    InsufficientCredits,
    /// Any other failure reported by the server.
    Server,
}

impl ErrorCategory {
    pub fn classify(message: &str) -> Self {
        if message.contains("credits") {
            Self::InsufficientCredits
        } else {
            Self::Server
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientCredits => "insufficient_credits",
            Self::Server => "server",
        }
    }
}

/// One classified line of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Step or message payload, shape untouched.
    Payload(Value),
    /// `{ "error": "..." }` reported inside an otherwise healthy stream.
    InlineError {
        message: String,
        category: ErrorCategory,
    },
    /// Line that is not a JSON object.
    Malformed { raw: String, error: String },
}

impl Record {
    pub fn is_payload(&self) -> bool {
        matches!(self, Self::Payload(_))
    }

    pub fn inline_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::InlineError {
            category: ErrorCategory::classify(&message),
            message,
        }
    }
}

/// Parse one decoded line and tag it.
pub fn classify_line(line: &str) -> Record {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(object)) => classify_object(object),
        Ok(other) => Record::Malformed {
            raw: line.to_owned(),
            error: format!("expected a JSON object, got {}", value_type_name(&other)),
        },
        Err(error) => Record::Malformed {
            raw: line.to_owned(),
            error: error.to_string(),
        },
    }
}

fn classify_object(object: Map<String, Value>) -> Record {
    let has_payload = PAYLOAD_FIELDS.iter().any(|field| object.contains_key(*field));
    if !has_payload {
        if let Some(Value::String(message)) = object.get("error") {
            return Record::inline_error(message.clone());
        }
    }

    Record::Payload(Value::Object(object))
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
