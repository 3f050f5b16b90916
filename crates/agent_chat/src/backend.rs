//! Where turns are sent: the hosted chat endpoint or an in-process mock
//! runtime.

use std::future::Future;
use std::sync::Arc;

use agent_provider::{
    AgentRuntime, CallbackStyle, EpisodeRequest, InstanceMonitor, InstanceType,
};
use agent_provider_http::{HttpInstanceMonitor, HTTP_PROVIDER_ID};
use agent_provider_mock::{MockInstanceMonitor, MockRuntime, MOCK_PROVIDER_ID};
use agent_transcript::{EpisodeRecords, IngestMode, Turn};
use anyhow::{anyhow, bail, Context};
use chat_api::{ChatApiClient, ChatApiError, InstanceClient, Record, RecordSource, RecordStream};
use tracing::{info, warn};

use crate::config::ChatSettings;

pub const DEFAULT_PROVIDER_ID: &str = MOCK_PROVIDER_ID;
pub const PROVIDER_ENV_VAR: &str = "AGENT_CHAT_PROVIDER";
pub const MOCK_INSTANCE_ID: &str = "mock-instance";

/// Instance a session is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub instance_id: String,
    pub stream_url: Option<String>,
    /// True when this process started the instance and should stop it on exit.
    pub owned: bool,
}

pub enum Backend {
    Mock {
        runtime: Arc<MockRuntime>,
        monitor: Arc<MockInstanceMonitor>,
    },
    Http {
        chat: ChatApiClient,
        instances: InstanceClient,
        monitor: Arc<HttpInstanceMonitor>,
    },
}

impl Backend {
    pub fn mock(runtime: Arc<MockRuntime>) -> Self {
        Self::Mock {
            runtime,
            monitor: Arc::new(MockInstanceMonitor::healthy()),
        }
    }

    pub fn http(settings: &ChatSettings) -> anyhow::Result<Self> {
        let chat = ChatApiClient::new(settings.chat_api_config())
            .context("failed to build chat client")?;
        let instances = InstanceClient::new(settings.chat_api_config())
            .context("failed to build instance client")?;
        let monitor = HttpInstanceMonitor::new(settings.monitor_config())
            .map_err(|error| anyhow!("failed to build instance monitor: {error}"))?;
        Ok(Self::Http {
            chat,
            instances,
            monitor: Arc::new(monitor),
        })
    }

    pub fn for_id(provider_id: &str, settings: &ChatSettings) -> anyhow::Result<Self> {
        match provider_id {
            MOCK_PROVIDER_ID => Ok(Self::mock(Arc::new(MockRuntime::default()))),
            HTTP_PROVIDER_ID => Self::http(settings),
            unknown => bail!(
                "Unsupported provider '{unknown}'. Available providers: {MOCK_PROVIDER_ID}, {HTTP_PROVIDER_ID}"
            ),
        }
    }

    pub fn provider_id(&self) -> &'static str {
        match self {
            Self::Mock { .. } => MOCK_PROVIDER_ID,
            Self::Http { .. } => HTTP_PROVIDER_ID,
        }
    }

    pub fn monitor(&self) -> Arc<dyn InstanceMonitor> {
        match self {
            Self::Mock { monitor, .. } => Arc::clone(monitor) as Arc<dyn InstanceMonitor>,
            Self::Http { monitor, .. } => Arc::clone(monitor) as Arc<dyn InstanceMonitor>,
        }
    }

    /// Attaches to `existing` or starts a new instance of `instance_type`.
    pub async fn provision(
        &self,
        instance_type: InstanceType,
        existing: Option<&str>,
    ) -> anyhow::Result<Provisioned> {
        let existing = existing.map(str::trim).filter(|id| !id.is_empty());
        match self {
            Self::Mock { .. } => Ok(Provisioned {
                instance_id: existing.unwrap_or(MOCK_INSTANCE_ID).to_string(),
                stream_url: None,
                owned: existing.is_none(),
            }),
            Self::Http { instances, .. } => match existing {
                Some(instance_id) => {
                    let info = instances
                        .get(instance_id)
                        .await
                        .with_context(|| format!("failed to look up instance {instance_id}"))?;
                    if !info.is_healthy() {
                        bail!("instance {instance_id} is {}", info.status.as_str());
                    }
                    Ok(Provisioned {
                        instance_id: info.id,
                        stream_url: None,
                        owned: false,
                    })
                }
                None => {
                    let started = instances
                        .start(instance_type)
                        .await
                        .context("failed to start instance")?;
                    Ok(Provisioned {
                        instance_id: started.instance_id,
                        stream_url: started.stream_url,
                        owned: true,
                    })
                }
            },
        }
    }

    /// Stops `instance_id`. Failures are logged; the caller is tearing down.
    pub async fn release(&self, instance_id: &str) {
        match self {
            Self::Mock { .. } => info!(instance_id, "mock instance released"),
            Self::Http { instances, .. } => {
                if let Err(error) = instances.stop(instance_id).await {
                    warn!(instance_id, %error, "failed to stop instance");
                }
            }
        }
    }

    /// Opens the record source for `turn`. A request that fails before the
    /// response starts is reported through the source, so the session ends
    /// the turn the same way it ends a failed stream.
    pub async fn open(&self, turn: &Turn, mode: IngestMode) -> TurnSource {
        match self {
            Self::Mock { runtime, .. } => {
                let request = EpisodeRequest::for_instance(
                    turn.request.model_name.clone(),
                    turn.request.instance_type,
                    turn.request.messages.clone(),
                    callback_style(mode),
                );
                let runtime: Arc<dyn AgentRuntime> = runtime.clone();
                match EpisodeRecords::spawn(runtime, request, turn.cancel_signal()) {
                    Ok(records) => TurnSource::Episode(records),
                    Err(error) => TurnSource::Failed(Some(ChatApiError::Instance(error))),
                }
            }
            Self::Http { chat, .. } => {
                match chat.open_stream(&turn.request, turn.cancel_signal()).await {
                    Ok(stream) => TurnSource::Stream(stream),
                    Err(error) => TurnSource::Failed(Some(error)),
                }
            }
        }
    }
}

pub fn callback_style(mode: IngestMode) -> CallbackStyle {
    match mode {
        IngestMode::Step => CallbackStyle::PerStep,
        IngestMode::Message => CallbackStyle::PerMessage,
    }
}

/// Provider id from `AGENT_CHAT_PROVIDER`, defaulting to the mock.
pub fn provider_id_from_env() -> String {
    std::env::var(PROVIDER_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_PROVIDER_ID.to_string())
}

/// Record source of one turn.
pub enum TurnSource {
    Stream(RecordStream),
    Episode(EpisodeRecords),
    /// The request failed before any record; yields the error once.
    Failed(Option<ChatApiError>),
}

impl TurnSource {
    /// Releases the source, waiting for an in-process episode to exit.
    pub fn finish(self) {
        if let Self::Episode(records) = self {
            records.join();
        }
    }
}

impl RecordSource for TurnSource {
    fn next_record(
        &mut self,
    ) -> impl Future<Output = Option<Result<Record, ChatApiError>>> + Send {
        async move {
            match self {
                Self::Stream(stream) => stream.next_record().await,
                Self::Episode(records) => records.next_record().await,
                Self::Failed(error) => error.take().map(Err),
            }
        }
    }
}
