//! Session configuration and its environment overrides.

use agent_provider::InstanceType;

use crate::cancel::HealthCheckPolicy;
use crate::error::ConfigError;
use crate::retention::RetentionPolicy;
use crate::transcript::IngestMode;

pub const MODE_ENV_VAR: &str = "AGENT_TRANSCRIPT_MODE";
pub const RETAINED_IMAGES_ENV_VAR: &str = "AGENT_TRANSCRIPT_RETAINED_IMAGES";
pub const HEALTH_CHECK_ENV_VAR: &str = "AGENT_TRANSCRIPT_HEALTH_CHECK";

/// Everything a session needs to build requests and fold their responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Credential forwarded in every chat request body.
    pub api_key: String,
    pub model_name: String,
    pub instance_type: InstanceType,
    pub mode: IngestMode,
    pub retention: RetentionPolicy,
    pub health_check: HealthCheckPolicy,
}

impl SessionConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model_name: model_name.into(),
            instance_type: InstanceType::default(),
            mode: IngestMode::default(),
            retention: RetentionPolicy::default(),
            health_check: HealthCheckPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_instance_type(mut self, instance_type: InstanceType) -> Self {
        self.instance_type = instance_type;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: IngestMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_retained_images(mut self, keep: usize) -> Self {
        self.retention = RetentionPolicy::new(keep);
        self
    }

    #[must_use]
    pub fn with_health_check(mut self, health_check: HealthCheckPolicy) -> Self {
        self.health_check = health_check;
        self
    }

    /// Applies `AGENT_TRANSCRIPT_*` overrides from the process environment.
    /// Unset or blank variables keep the current value.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = read(MODE_ENV_VAR) {
            self.mode = value
                .parse()
                .map_err(|reason| invalid(MODE_ENV_VAR, &value, reason))?;
        }

        if let Some(value) = read(RETAINED_IMAGES_ENV_VAR) {
            let keep = value.parse::<usize>().map_err(|error| {
                invalid(RETAINED_IMAGES_ENV_VAR, &value, error.to_string())
            })?;
            self.retention = RetentionPolicy::new(keep);
        }

        if let Some(value) = read(HEALTH_CHECK_ENV_VAR) {
            self.health_check = value
                .parse()
                .map_err(|reason| invalid(HEALTH_CHECK_ENV_VAR, &value, reason))?;
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("api_key"));
        }
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::Missing("model_name"));
        }
        Ok(())
    }
}

fn invalid(var: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason,
    }
}
