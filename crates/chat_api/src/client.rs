use std::future::Future;
use std::time::Duration;

use agent_provider::CancelSignal;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::headers::{build_headers, HeaderTarget};
use crate::payload::ChatRequest;
use crate::retry::{is_retryable_http_error, retry_delay_ms, MAX_RETRIES};
use crate::stream::RecordStream;
use crate::url::normalize_chat_url;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Client for the streaming chat endpoint.
#[derive(Debug, Clone)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    pub fn build_headers(&self, target: HeaderTarget) -> Result<HeaderMap, ChatApiError> {
        header_map(&self.config, target)
    }

    pub fn build_request(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        validate_request(request)?;

        let headers = self.build_headers(HeaderTarget::ChatStream)?;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(request))
    }

    /// Sends the request, retrying transient failures until the body starts.
    pub async fn send_with_retry(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Response, ChatApiError> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if let Some(error) = cancelled_error(cancellation) {
                return Err(error);
            }

            let response = self.build_request(request)?.send();
            let response = await_or_cancel(response, cancellation).await?;

            match response {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    last_status = Some(status);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_default();
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < MAX_RETRIES && is_retryable_http_error(status.as_u16(), &body) {
                        debug!(attempt, %status, "retrying chat stream request");
                        await_or_cancel(tokio::time::sleep(retry_delay_ms(attempt)), cancellation)
                            .await?;
                        continue;
                    }

                    return Err(ChatApiError::Status(status, message));
                }
                Err(error) => {
                    if error.is_builder() {
                        return Err(ChatApiError::Request(error));
                    }
                    let message = error.to_string();
                    last_error = Some(message.clone());
                    if attempt < MAX_RETRIES {
                        debug!(attempt, error = %message, "retrying chat stream request");
                        await_or_cancel(tokio::time::sleep(retry_delay_ms(attempt)), cancellation)
                            .await?;
                    }
                }
            }
        }

        warn!(status = ?last_status, error = ?last_error, "chat stream request retries exhausted");
        Err(ChatApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Opens the chat stream and returns its classified records.
    ///
    /// The returned stream owns the response body; it is released when the
    /// stream ends, fails, observes `cancel`, or is dropped.
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
        cancel: CancelSignal,
    ) -> Result<RecordStream, ChatApiError> {
        let response = self.send_with_retry(request, Some(&cancel)).await?;
        let chunks = response.bytes_stream().map(|chunk| chunk.map_err(ChatApiError::from));
        Ok(RecordStream::new(chunks, cancel))
    }
}

pub(crate) fn header_map(
    config: &ChatApiConfig,
    target: HeaderTarget,
) -> Result<HeaderMap, ChatApiError> {
    let headers = build_headers(config, target, config.user_agent.as_deref())?;
    let mut out = HeaderMap::new();
    for (key, value) in headers {
        out.insert(
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header key: {key}")))?,
            HeaderValue::from_str(&value)
                .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header value for {key}")))?,
        );
    }
    Ok(out)
}

fn validate_request(request: &ChatRequest) -> Result<(), ChatApiError> {
    if request.api_key.trim().is_empty() {
        return Err(ChatApiError::MissingApiKey);
    }
    if request.instance_id.trim().is_empty() {
        return Err(ChatApiError::MissingInstanceId);
    }
    Ok(())
}

fn cancelled_error(cancel: Option<&CancelSignal>) -> Option<ChatApiError> {
    cancel
        .and_then(CancelSignal::reason)
        .map(ChatApiError::Cancelled)
}

/// Awaits `future`, polling `cancellation` so a cancelled signal is observed
/// within [`CANCEL_POLL_INTERVAL`] even while the future is pending.
pub async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancelSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if let Some(error) = cancelled_error(cancellation) {
            return Err(error);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            return Ok(output);
        }
    }
}
