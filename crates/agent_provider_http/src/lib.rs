//! Instance API-backed implementation of the `agent_provider` status contract.
//!
//! The transcript side asks for instance health from synchronous worker
//! threads; this adapter drives the async `chat_api` instance client on a
//! private current-thread runtime for each query.

use std::sync::Arc;
use std::time::Duration;

use agent_provider::{InstanceInfo, InstanceMonitor, ProviderInitError};
use chat_api::{ChatApiConfig, ChatApiError, InstanceClient};
use tracing::debug;

/// Stable identifier used by `agent_chat` startup selection.
pub const HTTP_PROVIDER_ID: &str = "http";

/// Runtime configuration for the instance status adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpInstanceMonitorConfig {
    pub api_key: String,
    pub instance_api_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpInstanceMonitorConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            instance_api_url: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_instance_api_url(mut self, instance_api_url: impl Into<String>) -> Self {
        self.instance_api_url = Some(instance_api_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_chat_api_config(self) -> ChatApiConfig {
        let mut config = ChatApiConfig::new(self.api_key);

        if let Some(instance_api_url) = self.instance_api_url {
            config = config.with_instance_api_url(instance_api_url);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

trait StatusClient: Send + Sync {
    fn status(&self, instance_id: &str) -> Result<InstanceInfo, ChatApiError>;
}

#[derive(Debug)]
struct DefaultStatusClient {
    client: InstanceClient,
}

impl StatusClient for DefaultStatusClient {
    fn status(&self, instance_id: &str) -> Result<InstanceInfo, ChatApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                ChatApiError::Instance(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(self.client.get(instance_id))
    }
}

/// `InstanceMonitor` adapter backed by the instance lifecycle API.
pub struct HttpInstanceMonitor {
    status_client: Arc<dyn StatusClient>,
}

impl HttpInstanceMonitor {
    /// Creates a monitor using the real instance API transport.
    pub fn new(config: HttpInstanceMonitorConfig) -> Result<Self, ProviderInitError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderInitError::new(
                "Failed to initialize http instance monitor: API key is required",
            ));
        }

        let status_client = Arc::new(DefaultStatusClient {
            client: InstanceClient::new(config.into_chat_api_config()).map_err(map_init_error)?,
        });

        Ok(Self { status_client })
    }

    #[cfg(test)]
    fn with_status_client_for_tests(status_client: Arc<dyn StatusClient>) -> Self {
        Self { status_client }
    }
}

impl InstanceMonitor for HttpInstanceMonitor {
    fn instance(&self, instance_id: &str) -> Result<InstanceInfo, String> {
        let info = self
            .status_client
            .status(instance_id)
            .map_err(|error| format!("Instance status request failed: {error}"))?;
        debug!(instance_id, status = %info.status, "instance status");
        Ok(info)
    }
}

fn map_init_error(error: ChatApiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize http instance monitor: {error}"))
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};

    use agent_provider::InstanceStatus;

    use super::*;

    struct FakeStatusClient {
        observed: Mutex<Vec<String>>,
        outcome: Mutex<Option<Result<InstanceInfo, ChatApiError>>>,
    }

    impl FakeStatusClient {
        fn returning(outcome: Result<InstanceInfo, ChatApiError>) -> Arc<Self> {
            Arc::new(Self {
                observed: Mutex::new(Vec::new()),
                outcome: Mutex::new(Some(outcome)),
            })
        }

        fn observed(&self) -> Vec<String> {
            lock_unpoisoned(&self.observed).clone()
        }
    }

    impl StatusClient for FakeStatusClient {
        fn status(&self, instance_id: &str) -> Result<InstanceInfo, ChatApiError> {
            lock_unpoisoned(&self.observed).push(instance_id.to_string());

            match lock_unpoisoned(&self.outcome).take() {
                Some(outcome) => outcome,
                None => panic!("fake status outcome should be consumed exactly once"),
            }
        }
    }

    fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn instance_forwards_the_status_snapshot() {
        let client = FakeStatusClient::returning(Ok(InstanceInfo::new(
            "inst-1",
            InstanceStatus::Running,
        )));
        let monitor = HttpInstanceMonitor::with_status_client_for_tests(
            Arc::clone(&client) as Arc<dyn StatusClient>,
        );

        let info = monitor.instance("inst-1").expect("status should succeed");

        assert!(info.is_healthy());
        assert_eq!(client.observed(), vec!["inst-1".to_string()]);
    }

    #[test]
    fn transport_failures_become_contract_errors() {
        let client = FakeStatusClient::returning(Err(ChatApiError::Instance("boom".to_string())));
        let monitor = HttpInstanceMonitor::with_status_client_for_tests(client);

        let error = monitor
            .instance("inst-1")
            .expect_err("status should fail");

        assert!(error.starts_with("Instance status request failed"));
        assert!(error.contains("boom"));
    }

    #[test]
    fn blank_api_key_is_rejected_at_construction() {
        let error = match HttpInstanceMonitor::new(HttpInstanceMonitorConfig::new("  ")) {
            Ok(_) => panic!("blank key should be rejected"),
            Err(error) => error,
        };

        assert!(error.message().contains("API key is required"));
    }
}
