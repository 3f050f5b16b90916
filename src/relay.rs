//! Server half of the stream: runs an episode and writes its records as
//! newline-delimited JSON.

use std::io::{self, Write};
use std::sync::Arc;

use agent_provider::{
    AgentRuntime, CallbackStyle, CancelReason, CancelSignal, EpisodeEvent, EpisodeRequest,
    InstanceMonitor, USER_ABORT_MESSAGE,
};
use chat_api::{encode_line, KEEPALIVE_LINE};
use serde_json::json;
use tracing::{debug, warn};

use crate::cancel::{CancellationCoordinator, HealthCheckPolicy};

/// How a relayed episode ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEnd {
    Completed,
    /// Stopped through the cancel signal. Nothing is written for it.
    Cancelled(CancelReason),
    /// Runtime failure, written to the stream as an `{"error": ...}` line.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySummary {
    pub end: RelayEnd,
    pub records: usize,
}

/// Writes one episode per call to an NDJSON sink.
pub struct Relay {
    runtime: Arc<dyn AgentRuntime>,
    monitor: Option<Arc<dyn InstanceMonitor>>,
    health_check: HealthCheckPolicy,
}

impl Relay {
    #[must_use]
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            runtime,
            monitor: None,
            health_check: HealthCheckPolicy::Disabled,
        }
    }

    #[must_use]
    pub fn with_health_check(
        mut self,
        policy: HealthCheckPolicy,
        monitor: Arc<dyn InstanceMonitor>,
    ) -> Self {
        self.health_check = policy;
        self.monitor = Some(monitor);
        self
    }

    /// Runs `request` against `instance_id`, writing every record to `out`.
    ///
    /// In message style each record is followed by a keepalive line. A failed
    /// write stops the episode and is returned as the error.
    pub fn run<W: Write>(
        &self,
        request: EpisodeRequest,
        instance_id: &str,
        cancel: CancelSignal,
        out: &mut W,
    ) -> io::Result<RelaySummary> {
        let style = request.style;
        let mut coordinator = CancellationCoordinator::new(cancel);
        if let Some(monitor) = &self.monitor {
            coordinator =
                coordinator.with_health_check(self.health_check, Arc::clone(monitor), instance_id);
        }

        let mut records = 0usize;
        let mut write_error: Option<io::Error> = None;

        let outcome = {
            let mut emit = |event: EpisodeEvent| {
                if write_error.is_some() {
                    return;
                }
                if matches!(event, EpisodeEvent::Step(_) | EpisodeEvent::AssistantMessage(_)) {
                    coordinator.on_step_boundary();
                }

                match write_event(out, &event, style) {
                    Ok(()) => records += 1,
                    Err(error) => {
                        warn!(%error, "relay sink failed; aborting episode");
                        coordinator.abort();
                        write_error = Some(error);
                    }
                }
            };

            self.runtime
                .run_episode(request, coordinator.signal().clone(), &mut emit)
        };

        if let Some(error) = write_error {
            return Err(error);
        }

        let end = match outcome {
            Ok(()) => {
                coordinator.complete();
                RelayEnd::Completed
            }
            Err(error) if error == USER_ABORT_MESSAGE => {
                let reason = coordinator.reason().unwrap_or(CancelReason::UserAbort);
                debug!(%reason, "episode aborted");
                RelayEnd::Cancelled(reason)
            }
            Err(error) => {
                out.write_all(encode_line(&json!({ "error": error.as_str() }))?.as_bytes())?;
                out.flush()?;
                RelayEnd::Failed(error)
            }
        };

        Ok(RelaySummary { end, records })
    }
}

fn write_event<W: Write>(out: &mut W, event: &EpisodeEvent, style: CallbackStyle) -> io::Result<()> {
    let record = event.to_record()?;
    out.write_all(encode_line(&record)?.as_bytes())?;
    if style == CallbackStyle::PerMessage && !event.is_step() {
        out.write_all(KEEPALIVE_LINE.as_bytes())?;
    }
    out.flush()
}
