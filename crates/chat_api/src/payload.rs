use agent_provider::{InstanceType, Message};
use serde::{Deserialize, Serialize};

/// Request body POSTed to the streaming chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub api_key: String,
    pub instance_id: String,
    pub instance_type: InstanceType,
    pub model_name: String,
    /// Current transcript, oldest first.
    pub messages: Vec<Message>,
}

impl ChatRequest {
    pub fn new(
        api_key: impl Into<String>,
        instance_id: impl Into<String>,
        instance_type: InstanceType,
        model_name: impl Into<String>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            instance_id: instance_id.into(),
            instance_type,
            model_name: model_name.into(),
            messages,
        }
    }
}

/// Body of the instance start call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct StartInstanceBody {
    pub instance_type: InstanceType,
}
