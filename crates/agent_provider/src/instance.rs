use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of sandbox the agent drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    #[default]
    Ubuntu,
    Browser,
}

impl InstanceType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ubuntu" => Some(Self::Ubuntu),
            "browser" => Some(Self::Browser),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ubuntu => "ubuntu",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state reported by the instance status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Deploying,
    Running,
    Paused,
    Stopped,
    Terminated,
    Error,
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deploying => "deploying",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one remote instance as returned by the status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<InstanceType>,
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstanceInfo {
    #[must_use]
    pub fn new(id: impl Into<String>, status: InstanceStatus) -> Self {
        Self {
            id: id.into(),
            instance_type: None,
            status,
            launch_time: None,
            error: None,
        }
    }

    /// An instance is healthy only while running with no reported error.
    pub fn is_healthy(&self) -> bool {
        self.status == InstanceStatus::Running
            && self.error.as_deref().map_or(true, str::is_empty)
    }
}

/// Handle returned when a new instance has been started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedInstance {
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_status_values_decode_as_unknown() {
        let info: InstanceInfo = serde_json::from_value(json!({
            "id": "inst-1",
            "status": "rebooting"
        }))
        .expect("info should decode");

        assert_eq!(info.status, InstanceStatus::Unknown);
        assert!(!info.is_healthy());
    }

    #[test]
    fn running_instance_with_error_is_unhealthy() {
        let mut info = InstanceInfo::new("inst-1", InstanceStatus::Running);
        assert!(info.is_healthy());

        info.error = Some("kernel panic".to_string());
        assert!(!info.is_healthy());
    }

    #[test]
    fn instance_type_parses_case_insensitively() {
        assert_eq!(InstanceType::parse(" Browser "), Some(InstanceType::Browser));
        assert_eq!(InstanceType::parse("ubuntu"), Some(InstanceType::Ubuntu));
        assert_eq!(InstanceType::parse("windows"), None);
    }
}
