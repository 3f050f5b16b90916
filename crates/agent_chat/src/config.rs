//! Settings file for the console client.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agent_provider::InstanceType;
use agent_provider_http::HttpInstanceMonitorConfig;
use agent_transcript::SessionConfig;
use anyhow::{bail, Context};
use chat_api::ChatApiConfig;
use serde::Deserialize;

pub const CONFIG_PATH_ENV_VAR: &str = "AGENT_CHAT_CONFIG_PATH";
pub const DEFAULT_MODEL_NAME: &str = "claude-3-7-sonnet-20250219";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatSettings {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub instance_api_url: Option<String>,
    /// Attach to this running instance instead of starting one.
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub instance_type: InstanceType,
    pub model_name: String,
    #[serde(default)]
    pub timeout_sec: Option<u64>,
}

impl ChatSettings {
    /// Settings for the offline mock backend.
    pub fn offline() -> Self {
        Self {
            api_key: "mock".to_string(),
            base_url: None,
            instance_api_url: None,
            instance_id: None,
            instance_type: InstanceType::default(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            timeout_sec: None,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads the file named by `AGENT_CHAT_CONFIG_PATH`, if set.
    pub fn from_env() -> anyhow::Result<Option<Self>> {
        match config_path_from_env() {
            Some(path) => Self::load(&path).map(Some),
            None => Ok(None),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            bail!("api_key must not be blank");
        }
        if self.model_name.trim().is_empty() {
            bail!("model_name must not be blank");
        }
        if self.timeout_sec == Some(0) {
            bail!("timeout_sec must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_sec.map(Duration::from_secs)
    }

    pub fn chat_api_config(&self) -> ChatApiConfig {
        let mut config = ChatApiConfig::new(self.api_key.clone());
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(instance_api_url) = &self.instance_api_url {
            config = config.with_instance_api_url(instance_api_url.clone());
        }
        if let Some(timeout) = self.timeout() {
            config = config.with_timeout(timeout);
        }
        config
    }

    pub fn monitor_config(&self) -> HttpInstanceMonitorConfig {
        let mut config = HttpInstanceMonitorConfig::new(self.api_key.clone());
        if let Some(instance_api_url) = &self.instance_api_url {
            config = config.with_instance_api_url(instance_api_url.clone());
        }
        if let Some(timeout) = self.timeout() {
            config = config.with_timeout(timeout);
        }
        config
    }

    /// Session settings, with `AGENT_TRANSCRIPT_*` overrides applied.
    pub fn session_config(&self) -> anyhow::Result<SessionConfig> {
        SessionConfig::new(self.api_key.clone(), self.model_name.clone())
            .with_instance_type(self.instance_type)
            .apply_env()
            .context("invalid session override")
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
