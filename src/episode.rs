//! Bridges a callback-style [`AgentRuntime`] episode into a pull-based record
//! source.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use agent_provider::{
    AgentRuntime, CancelReason, CancelSignal, EpisodeEvent, EpisodeRequest, USER_ABORT_MESSAGE,
};
use chat_api::{await_or_cancel, ChatApiError, Record, RecordSource};
use tokio::sync::mpsc;
use tracing::{debug, warn};

static NEXT_EPISODE_ID: AtomicU64 = AtomicU64::new(1);

enum Bridged {
    Event(EpisodeEvent),
    Finished(Result<(), String>),
}

/// Records produced by one episode running on a worker thread.
///
/// Events arrive in emission order. A runtime failure is reported the same way
/// the relay reports it on the wire: as an inline error record, after which the
/// source ends. The user-abort failure is reported as cancellation instead.
pub struct EpisodeRecords {
    events: mpsc::UnboundedReceiver<Bridged>,
    cancel: CancelSignal,
    worker: Option<JoinHandle<()>>,
    done: bool,
}

impl EpisodeRecords {
    /// Starts `request` on a dedicated worker thread.
    pub fn spawn(
        runtime: Arc<dyn AgentRuntime>,
        request: EpisodeRequest,
        cancel: CancelSignal,
    ) -> Result<Self, String> {
        let episode_id = NEXT_EPISODE_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, events) = mpsc::unbounded_channel();
        let worker_cancel = cancel.clone();

        let worker = thread::Builder::new()
            .name(format!("agent-episode-{episode_id}"))
            .spawn(move || {
                let events = sender.clone();
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    runtime.run_episode(request, worker_cancel, &mut |event| {
                        let _ = events.send(Bridged::Event(event));
                    })
                }));
                let outcome = outcome.unwrap_or_else(|_| Err("Agent runtime panicked".to_string()));
                debug!(episode_id, ok = outcome.is_ok(), "episode finished");
                let _ = sender.send(Bridged::Finished(outcome));
            })
            .map_err(|error| format!("Failed to spawn episode worker: {error}"))?;

        Ok(Self {
            events,
            cancel,
            worker: Some(worker),
            done: false,
        })
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    fn finish(&mut self) {
        self.done = true;
        self.events.close();
    }

    pub async fn next_record(&mut self) -> Option<Result<Record, ChatApiError>> {
        if self.done {
            return None;
        }

        if let Some(reason) = self.cancel.reason() {
            self.finish();
            return Some(Err(ChatApiError::Cancelled(reason)));
        }

        let received = match await_or_cancel(self.events.recv(), Some(&self.cancel)).await {
            Ok(received) => received,
            Err(error) => {
                self.finish();
                return Some(Err(error));
            }
        };

        match received {
            Some(Bridged::Event(event)) => Some(Ok(event_record(&event))),
            Some(Bridged::Finished(Ok(()))) | None => {
                self.finish();
                None
            }
            Some(Bridged::Finished(Err(error))) => {
                self.finish();
                if error == USER_ABORT_MESSAGE {
                    let reason = self.cancel.reason().unwrap_or(CancelReason::UserAbort);
                    return Some(Err(ChatApiError::Cancelled(reason)));
                }
                warn!(%error, "agent episode failed");
                Some(Ok(Record::inline_error(error)))
            }
        }
    }

    /// Waits for the worker thread to exit. Cancels the episode first when it
    /// is still running.
    pub fn join(mut self) {
        self.shutdown(true);
    }

    fn shutdown(&mut self, wait: bool) {
        if !self.done {
            self.cancel.cancel(CancelReason::Completed);
            self.finish();
        }
        if let Some(worker) = self.worker.take() {
            if wait && worker.join().is_err() {
                warn!("episode worker panicked outside the runtime call");
            }
        }
    }
}

fn event_record(event: &EpisodeEvent) -> Record {
    match event.to_record() {
        Ok(value) => Record::Payload(value),
        Err(error) => Record::Malformed {
            raw: format!("{event:?}"),
            error: error.to_string(),
        },
    }
}

impl RecordSource for EpisodeRecords {
    fn next_record(
        &mut self,
    ) -> impl Future<Output = Option<Result<Record, ChatApiError>>> + Send {
        EpisodeRecords::next_record(self)
    }
}

impl Drop for EpisodeRecords {
    fn drop(&mut self) {
        self.shutdown(false);
    }
}
