mod support;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use agent_provider::{
    AgentRuntime, CallbackStyle, CancelReason, EpisodeRequest, Role, StepRecord,
};
use agent_provider_mock::{MockInstanceMonitor, MockRuntime, MockStep};
use agent_transcript::{
    EpisodeRecords, HealthCheckPolicy, IngestMode, Notice, Session, SessionConfig, SessionEvent,
    TurnEnd, TurnOutcome,
};
use pretty_assertions::assert_eq;

use support::{attached_session, start};

fn config() -> SessionConfig {
    SessionConfig::new("key", "claude-3-7-sonnet")
}

fn style_for(mode: IngestMode) -> CallbackStyle {
    match mode {
        IngestMode::Step => CallbackStyle::PerStep,
        IngestMode::Message => CallbackStyle::PerMessage,
    }
}

/// Runs one turn of `session` against `runtime`, returning the outcome and the
/// events seen. `on_start` receives the turn's cancel signal.
async fn run_episode_turn(
    session: &mut Session,
    runtime: Arc<MockRuntime>,
    on_start: impl FnOnce(agent_provider::CancelSignal),
) -> (TurnOutcome, Vec<SessionEvent>) {
    let turn = start(session, "what is on the screen?");
    let request = EpisodeRequest::for_instance(
        turn.request.model_name.clone(),
        turn.request.instance_type,
        turn.request.messages.clone(),
        style_for(session.mode()),
    );
    on_start(turn.cancel_signal());

    let runtime: Arc<dyn AgentRuntime> = runtime;
    let mut records =
        EpisodeRecords::spawn(runtime, request, turn.cancel_signal()).expect("spawn episode");
    let mut events = Vec::new();
    let outcome = session
        .consume(turn, &mut records, &mut |event| events.push(event))
        .await;
    records.join();
    (outcome, events)
}

#[tokio::test]
async fn episode_is_folded_into_the_transcript() {
    let runtime = Arc::new(MockRuntime::default().with_step_delay(Duration::ZERO));
    let mut session = attached_session(config());

    let (outcome, events) = run_episode_turn(&mut session, Arc::clone(&runtime), |_| {}).await;

    assert_eq!(outcome, TurnOutcome { end: TurnEnd::Completed, appended: 5 });
    assert_eq!(
        session
            .transcript()
            .messages()
            .iter()
            .map(|message| message.role)
            .collect::<Vec<_>>(),
        vec![
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
        ]
    );
    assert_eq!(events.len(), 5);
    assert!(!session.is_streaming());
    assert_eq!(runtime.episodes(), 1);
    let request = runtime.last_request().expect("request recorded");
    assert_eq!(request.style, CallbackStyle::PerStep);
    assert_eq!(request.messages.len(), 1);
}

#[tokio::test]
async fn second_turn_sends_the_whole_transcript() {
    let runtime = Arc::new(MockRuntime::default().with_step_delay(Duration::ZERO));
    let mut session = attached_session(config());

    run_episode_turn(&mut session, Arc::clone(&runtime), |_| {}).await;
    run_episode_turn(&mut session, Arc::clone(&runtime), |_| {}).await;

    let request = runtime.last_request().expect("request recorded");
    assert_eq!(request.messages.len(), 7);
    assert_eq!(request.messages[6].role, Role::User);
    assert_eq!(session.transcript().len(), 12);
}

#[tokio::test]
async fn message_mode_matches_step_mode_for_the_same_episode() {
    let runtime = Arc::new(MockRuntime::default().with_step_delay(Duration::ZERO));
    let mut steps = attached_session(config());
    let mut messages = attached_session(config().with_mode(IngestMode::Message));

    run_episode_turn(&mut steps, Arc::clone(&runtime), |_| {}).await;
    run_episode_turn(&mut messages, Arc::clone(&runtime), |_| {}).await;

    assert_eq!(
        runtime.last_request().map(|request| request.style),
        Some(CallbackStyle::PerMessage)
    );
    assert_eq!(messages.transcript().messages(), steps.transcript().messages());
}

#[tokio::test]
async fn terminated_instance_cancels_the_turn() {
    let runtime = Arc::new(MockRuntime::default().with_step_delay(Duration::from_millis(200)));
    let monitor = Arc::new(MockInstanceMonitor::terminating_after(1));
    let mut session = attached_session(config().with_health_check(HealthCheckPolicy::EveryStep))
        .with_monitor(monitor.clone());

    let (outcome, events) = run_episode_turn(&mut session, runtime, |_| {}).await;

    assert_eq!(
        outcome.end,
        TurnEnd::Cancelled(CancelReason::InstanceTerminated)
    );
    assert_eq!(outcome.appended, 4);
    assert_eq!(monitor.queries(), 2);
    assert!(events
        .iter()
        .all(|event| !matches!(event, SessionEvent::Notice(_))));
}

#[tokio::test]
async fn health_checks_are_skipped_when_disabled() {
    let runtime = Arc::new(MockRuntime::default().with_step_delay(Duration::ZERO));
    let monitor = Arc::new(MockInstanceMonitor::terminating_after(0));
    let mut session = attached_session(config()).with_monitor(monitor.clone());

    let (outcome, _) = run_episode_turn(&mut session, runtime, |_| {}).await;

    assert_eq!(outcome.end, TurnEnd::Completed);
    assert_eq!(monitor.queries(), 0);
}

#[tokio::test]
async fn user_abort_keeps_what_was_already_folded() {
    let runtime = Arc::new(MockRuntime::default().with_step_delay(Duration::from_millis(300)));
    let mut session = attached_session(config());

    let (outcome, events) = run_episode_turn(&mut session, runtime, |signal| {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(450));
            signal.cancel(CancelReason::UserAbort);
        });
    })
    .await;

    assert_eq!(outcome.end, TurnEnd::Cancelled(CancelReason::UserAbort));
    assert_eq!(session.transcript().len(), 3);
    assert!(events
        .iter()
        .all(|event| !matches!(event, SessionEvent::Notice(_))));
    assert!(!session.is_streaming());
}

#[tokio::test]
async fn runtime_failure_is_reported_without_losing_progress() {
    let runtime = Arc::new(
        MockRuntime::new(vec![
            MockStep::Step(StepRecord::text("Opening the terminal.").with_response_id("r1")),
            MockStep::Fail("model overloaded".to_string()),
        ])
        .with_step_delay(Duration::ZERO),
    );
    let mut session = attached_session(config());

    let (outcome, events) = run_episode_turn(&mut session, runtime, |_| {}).await;

    assert_eq!(outcome, TurnOutcome { end: TurnEnd::Completed, appended: 1 });
    assert_eq!(
        events.last(),
        Some(&SessionEvent::Notice(Notice::ServerError(
            "model overloaded".to_string()
        )))
    );
    assert_eq!(session.transcript().len(), 2);
}
