use agent_provider::{InstanceInfo, InstanceType, StartedInstance};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::header_map;
use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::headers::HeaderTarget;
use crate::payload::StartInstanceBody;
use crate::url::instance_endpoint;

/// Client for the instance lifecycle API (start, status, stop).
#[derive(Debug, Clone)]
pub struct InstanceClient {
    http: Client,
    config: ChatApiConfig,
}

#[derive(Debug, Deserialize)]
struct StreamUrlBody {
    stream_url: Option<String>,
}

impl InstanceClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    /// Starts a new instance and resolves its stream URL.
    ///
    /// A failed stream URL lookup does not fail the start; the instance is
    /// already running and is returned without one.
    pub async fn start(&self, instance_type: InstanceType) -> Result<StartedInstance, ChatApiError> {
        let url = instance_endpoint(&self.config.instance_api_url, &["start"])?;
        let request = self
            .http
            .post(url)
            .json(&StartInstanceBody { instance_type });
        let started: InstanceInfo = self.send_json(request).await?;
        info!(instance_id = %started.id, %instance_type, "instance started");

        let stream_url = match self.stream_url(&started.id).await {
            Ok(stream_url) => stream_url,
            Err(error) => {
                debug!(instance_id = %started.id, %error, "stream url lookup failed");
                None
            }
        };

        Ok(StartedInstance {
            instance_id: started.id,
            stream_url,
        })
    }

    pub async fn get(&self, instance_id: &str) -> Result<InstanceInfo, ChatApiError> {
        let url = instance_endpoint(&self.config.instance_api_url, &["instance", require_id(instance_id)?])?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn stop(&self, instance_id: &str) -> Result<(), ChatApiError> {
        let url = instance_endpoint(
            &self.config.instance_api_url,
            &["instance", require_id(instance_id)?, "stop"],
        )?;
        self.send(self.http.post(url)).await?;
        info!(instance_id, "instance stopped");
        Ok(())
    }

    async fn stream_url(&self, instance_id: &str) -> Result<Option<String>, ChatApiError> {
        let url = instance_endpoint(
            &self.config.instance_api_url,
            &["instance", instance_id, "stream_url"],
        )?;
        let body: StreamUrlBody = self.send_json(self.http.get(url)).await?;
        Ok(body.stream_url.filter(|url| !url.is_empty()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ChatApiError> {
        let headers = header_map(&self.config, HeaderTarget::InstanceApi)?;
        let response = request.headers(headers).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ChatApiError::Status(status, parse_error_message(status, &body)))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ChatApiError> {
        let body = self.send(request).await?.text().await?;
        serde_json::from_str(&body).map_err(|error| {
            ChatApiError::Instance(format!("unexpected response body: {error}"))
        })
    }
}

fn require_id(instance_id: &str) -> Result<&str, ChatApiError> {
    let trimmed = instance_id.trim();
    if trimmed.is_empty() {
        return Err(ChatApiError::MissingInstanceId);
    }
    Ok(trimmed)
}
