use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::{DEFAULT_CHAT_BASE_URL, DEFAULT_INSTANCE_API_URL};

/// Transport configuration for the streaming chat endpoint and the instance API.
#[derive(Debug, Clone)]
pub struct ChatApiConfig {
    /// Credential forwarded in the request body and the `x-api-key` header.
    pub api_key: String,
    /// Base URL of the streaming chat endpoint host.
    pub base_url: String,
    /// Base URL of the instance lifecycle API.
    pub instance_api_url: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional connect timeout. Streaming bodies are unbounded, so no total
    /// request timeout is applied to them.
    pub timeout: Option<Duration>,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            instance_api_url: DEFAULT_INSTANCE_API_URL.to_string(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl ChatApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_instance_api_url(mut self, instance_api_url: impl Into<String>) -> Self {
        self.instance_api_url = instance_api_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_headers.extend(headers);
        self
    }
}
