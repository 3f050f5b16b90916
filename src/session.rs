//! One conversation with a remote agent instance.

use std::sync::Arc;

use agent_provider::{CancelReason, CancelSignal, InstanceMonitor, Message, Role};
use chat_api::{ChatRequest, ErrorCategory, Record, RecordSource};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel::CancellationCoordinator;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::transcript::{FoldFn, IngestMode, Transcript};

/// Non-fatal condition surfaced to the user while a turn streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    InsufficientCredits(String),
    ServerError(String),
    MalformedRecord { raw: String, error: String },
    TransportFailed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::InsufficientCredits(message) => format!("Insufficient credits: {message}"),
            Self::ServerError(message) => format!("Server error: {message}"),
            Self::MalformedRecord { error, .. } => format!("Skipped malformed record: {error}"),
            Self::TransportFailed(message) => format!("Connection failed: {message}"),
        }
    }
}

/// Progress reported while a turn is consumed.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAppended(Message),
    ImagesEvicted(usize),
    Notice(Notice),
}

/// How a consumed turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEnd {
    Completed,
    Cancelled(CancelReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub end: TurnEnd,
    /// Messages folded into the transcript during this turn.
    pub appended: usize,
}

/// A started turn: the request to send and the triggers that may end it.
#[derive(Debug)]
pub struct Turn {
    pub request: ChatRequest,
    coordinator: CancellationCoordinator,
}

impl Turn {
    /// Signal to hand to the record source for this turn.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.coordinator.signal().clone()
    }
}

/// Result of submitting input.
#[derive(Debug)]
pub enum Submission {
    Started(Turn),
    /// Input arrived while a response was streaming; that response was aborted
    /// and nothing was sent.
    Stopped,
}

pub struct Session {
    id: String,
    config: SessionConfig,
    fold: FoldFn,
    transcript: Transcript,
    instance_id: Option<String>,
    monitor: Option<Arc<dyn InstanceMonitor>>,
    active: Option<CancelSignal>,
}

impl Session {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            fold: config.mode.fold_fn(),
            config,
            transcript: Transcript::new(),
            instance_id: None,
            monitor: None,
            active: None,
        }
    }

    /// Monitor used for per-step health checks when the config enables them.
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<dyn InstanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> IngestMode {
        self.config.mode
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub fn attach_instance(&mut self, instance_id: impl Into<String>) {
        let instance_id = instance_id.into();
        info!(session_id = %self.id, %instance_id, "instance attached");
        self.instance_id = Some(instance_id);
    }

    pub fn is_streaming(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|signal| !signal.is_cancelled())
    }

    /// Appends the user's message and prepares the request for a new turn.
    ///
    /// Submitting while a response streams stops that response instead.
    pub fn begin_turn(&mut self, text: &str) -> Result<Submission, SessionError> {
        if self.is_streaming() {
            self.abort();
            return Ok(Submission::Stopped);
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let instance_id = self.instance_id.clone().ok_or(SessionError::NoInstance)?;

        self.transcript.push(Message::user_text(text));
        self.config.retention.apply(self.transcript.messages_mut());

        let request = ChatRequest::new(
            self.config.api_key.clone(),
            instance_id.clone(),
            self.config.instance_type,
            self.config.model_name.clone(),
            self.transcript.to_vec(),
        );

        let mut coordinator = CancellationCoordinator::new(CancelSignal::new());
        if let Some(monitor) = &self.monitor {
            coordinator = coordinator.with_health_check(
                self.config.health_check,
                Arc::clone(monitor),
                instance_id,
            );
        }
        self.active = Some(coordinator.signal().clone());

        debug!(session_id = %self.id, messages = request.messages.len(), "turn started");
        Ok(Submission::Started(Turn {
            request,
            coordinator,
        }))
    }

    /// Folds every record of `source` into the transcript until it ends.
    pub async fn consume<S: RecordSource>(
        &mut self,
        turn: Turn,
        source: &mut S,
        on_event: &mut dyn FnMut(SessionEvent),
    ) -> TurnOutcome {
        let coordinator = turn.coordinator;
        let mut appended = 0usize;

        let end = loop {
            let Some(item) = source.next_record().await else {
                coordinator.complete();
                break TurnEnd::Completed;
            };

            match item {
                Ok(Record::Payload(value)) => {
                    appended += self.ingest(value, &coordinator, on_event);
                }
                Ok(Record::InlineError { message, category }) => {
                    warn!(%message, category = category.as_str(), "inline error in stream");
                    let notice = match category {
                        ErrorCategory::InsufficientCredits => Notice::InsufficientCredits(message),
                        ErrorCategory::Server => Notice::ServerError(message),
                    };
                    on_event(SessionEvent::Notice(notice));
                }
                Ok(Record::Malformed { raw, error }) => {
                    warn!(%error, "skipping malformed record");
                    on_event(SessionEvent::Notice(Notice::MalformedRecord { raw, error }));
                }
                Err(error) => match error.cancel_reason() {
                    Some(reason) => {
                        info!(session_id = %self.id, %reason, "turn cancelled");
                        break TurnEnd::Cancelled(reason);
                    }
                    None => {
                        let message = error.to_string();
                        warn!(session_id = %self.id, error = %message, "stream failed");
                        on_event(SessionEvent::Notice(Notice::TransportFailed(message.clone())));
                        coordinator.complete();
                        break TurnEnd::Failed(message);
                    }
                },
            }
        };

        if self
            .active
            .as_ref()
            .is_some_and(|active| active.same_as(coordinator.signal()))
        {
            self.active = None;
        }

        TurnOutcome { end, appended }
    }

    fn ingest(
        &mut self,
        value: serde_json::Value,
        coordinator: &CancellationCoordinator,
        on_event: &mut dyn FnMut(SessionEvent),
    ) -> usize {
        let messages = match (self.fold)(&value) {
            Ok(messages) => messages,
            Err(error) => {
                let raw = value.to_string();
                let error = error.to_string();
                warn!(%error, mode = %self.config.mode, "payload does not match the ingest mode");
                on_event(SessionEvent::Notice(Notice::MalformedRecord { raw, error }));
                return 0;
            }
        };

        match self.config.mode {
            IngestMode::Step => {
                coordinator.on_step_boundary();
            }
            IngestMode::Message => {
                if messages.iter().any(|message| message.role == Role::Assistant) {
                    coordinator.on_step_boundary();
                }
            }
        }

        let count = messages.len();
        for message in messages {
            self.transcript.push(message.clone());
            on_event(SessionEvent::MessageAppended(message));
        }

        let evicted = self.config.retention.apply(self.transcript.messages_mut());
        if evicted > 0 {
            on_event(SessionEvent::ImagesEvicted(evicted));
        }
        count
    }

    /// Aborts the streaming response, if any. A user abort never produces a
    /// notice.
    pub fn abort(&mut self) -> bool {
        match self.active.take() {
            Some(signal) => signal.cancel(CancelReason::UserAbort),
            None => false,
        }
    }

    /// Clears the transcript. Refused while a response is streaming.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.is_streaming() {
            return Err(SessionError::Busy);
        }
        self.active = None;
        self.transcript.clear();
        info!(session_id = %self.id, "transcript reset");
        Ok(())
    }

    /// Aborts any stream, clears the transcript and detaches the instance.
    /// Returns the detached instance id so the caller can stop it remotely.
    pub fn stop_instance(&mut self) -> Option<String> {
        self.abort();
        self.transcript.clear();
        let instance_id = self.instance_id.take();
        if let Some(instance_id) = &instance_id {
            info!(session_id = %self.id, %instance_id, "instance detached");
        }
        instance_id
    }
}
