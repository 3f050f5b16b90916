//! Deterministic mock implementations of the shared `agent_provider` contract.
//!
//! This crate contains no transport logic and is intended for local
//! development and contract-level integration testing of the transcript.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use agent_provider::{
    AgentRuntime, CallbackStyle, CancelSignal, EpisodeEvent, EpisodeRequest, InstanceInfo,
    InstanceMonitor, InstanceStatus, Message, Part, ProviderProfile, Role, StepRecord, ToolOutput,
    USER_ABORT_MESSAGE,
};
use serde_json::{json, Map, Value};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// 1x1 transparent PNG, small enough to keep scripted transcripts readable.
pub const MOCK_SCREENSHOT: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// One scripted cycle of the mock agent.
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// Reported as a step record, or as assistant/tool messages in message style.
    Step(StepRecord),
    /// Ends the episode with the given error.
    Fail(String),
}

/// Deterministic runtime replaying a fixed script.
#[derive(Debug)]
pub struct MockRuntime {
    script: Vec<MockStep>,
    model_id: String,
    step_delay: Duration,
    episodes: AtomicUsize,
    last_request: Mutex<Option<EpisodeRequest>>,
}

impl MockRuntime {
    const STEP_DELAY_MS: u64 = 150;
    const CANCEL_POLL_MS: u64 = 10;

    #[must_use]
    pub fn new(script: Vec<MockStep>) -> Self {
        Self {
            script,
            model_id: "mock".to_string(),
            step_delay: Duration::from_millis(Self::STEP_DELAY_MS),
            episodes: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        if !model_id.trim().is_empty() {
            self.model_id = model_id.trim().to_string();
        }
        self
    }

    /// Number of episodes started so far.
    pub fn episodes(&self) -> usize {
        self.episodes.load(Ordering::Acquire)
    }

    pub fn last_request(&self) -> Option<EpisodeRequest> {
        lock_unpoisoned(&self.last_request).clone()
    }

    /// Sleeps for the step delay, returning false as soon as `cancel` fires.
    fn pause(&self, cancel: &CancelSignal) -> bool {
        let deadline = Instant::now() + self.step_delay;
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let remaining = deadline - now;
            thread::sleep(remaining.min(Duration::from_millis(Self::CANCEL_POLL_MS)));
        }
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new(default_script())
    }
}

impl AgentRuntime for MockRuntime {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: self.model_id.clone(),
        }
    }

    fn run_episode(
        &self,
        req: EpisodeRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(EpisodeEvent),
    ) -> Result<(), String> {
        self.episodes.fetch_add(1, Ordering::AcqRel);
        let style = req.style;
        *lock_unpoisoned(&self.last_request) = Some(req);

        for step in &self.script {
            if !self.pause(&cancel) {
                return Err(USER_ABORT_MESSAGE.to_string());
            }

            match step {
                MockStep::Step(record) => match style {
                    CallbackStyle::PerStep => emit(EpisodeEvent::Step(record.clone())),
                    CallbackStyle::PerMessage => {
                        let (assistant, tool) = step_messages(record);
                        if let Some(assistant) = assistant {
                            emit(EpisodeEvent::AssistantMessage(assistant));
                        }
                        if let Some(tool) = tool {
                            emit(EpisodeEvent::ToolMessage(tool));
                        }
                    }
                },
                MockStep::Fail(error) => return Err(error.clone()),
            }
        }

        if cancel.is_cancelled() {
            return Err(USER_ABORT_MESSAGE.to_string());
        }
        Ok(())
    }
}

/// Shapes one step the way a message-style runtime reports it.
fn step_messages(record: &StepRecord) -> (Option<Message>, Option<Message>) {
    let mut content = record.reasoning_parts.clone().unwrap_or_default();
    if let Some(text) = record.text.as_deref().filter(|text| !text.is_empty()) {
        content.push(Part::text(text));
    }
    content.extend(record.tool_calls.clone().unwrap_or_default());

    let assistant = (!content.is_empty()).then(|| {
        Message::new(Role::Assistant, content).with_response_id(record.response_id.clone())
    });
    let tool = record.tool_results.clone().map(Message::tool);

    (assistant, tool)
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// A short computer-use episode: screenshot, a shell command, then a summary.
#[must_use]
pub fn default_script() -> Vec<MockStep> {
    vec![
        MockStep::Step(
            StepRecord::text("Let me look at the screen first.")
                .with_response_id("mock-response-1")
                .with_reasoning(vec![Part::reasoning("Need to see the current state.")])
                .with_tool_calls(vec![Part::tool_call(
                    "call-1",
                    "computer",
                    args(json!({"action": "screenshot"})),
                )])
                .with_tool_results(vec![Part::tool_result(
                    "call-1",
                    "computer",
                    ToolOutput::default().with_image(MOCK_SCREENSHOT),
                )]),
        ),
        MockStep::Step(
            StepRecord::text("Checking the working directory.")
                .with_response_id("mock-response-2")
                .with_tool_calls(vec![Part::tool_call(
                    "call-2",
                    "bash",
                    args(json!({"command": "pwd"})),
                )])
                .with_tool_results(vec![Part::tool_result(
                    "call-2",
                    "bash",
                    ToolOutput::output("/home/user\n"),
                )]),
        ),
        MockStep::Step(
            StepRecord::text("The desktop is idle and the shell is in /home/user.")
                .with_response_id("mock-response-3"),
        ),
    ]
}

/// Scripted instance monitor: reports `healthy_queries` running snapshots,
/// then the configured terminal status for every later query.
#[derive(Debug)]
pub struct MockInstanceMonitor {
    healthy_queries: usize,
    after: InstanceStatus,
    queries: AtomicUsize,
}

impl MockInstanceMonitor {
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            healthy_queries: usize::MAX,
            after: InstanceStatus::Running,
            queries: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn terminating_after(healthy_queries: usize) -> Self {
        Self {
            healthy_queries,
            after: InstanceStatus::Terminated,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::Acquire)
    }
}

impl Default for MockInstanceMonitor {
    fn default() -> Self {
        Self::healthy()
    }
}

impl InstanceMonitor for MockInstanceMonitor {
    fn instance(&self, instance_id: &str) -> Result<InstanceInfo, String> {
        let seen = self.queries.fetch_add(1, Ordering::AcqRel);
        let status = if seen < self.healthy_queries {
            InstanceStatus::Running
        } else {
            self.after
        };
        Ok(InstanceInfo::new(instance_id, status))
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
