#![allow(dead_code)]

use agent_provider::{CancelSignal, Message};
use agent_transcript::{Session, SessionConfig, SessionEvent, Submission, Turn, TurnOutcome};
use chat_api::{ChatApiError, RecordStream};
use futures_util::stream;
use serde_json::{json, Value};

/// Record stream over `body` cut into chunks of the given sizes (cycled).
pub fn chunked_stream(body: &[u8], sizes: &[usize], cancel: CancelSignal) -> RecordStream {
    let mut chunks: Vec<Result<Vec<u8>, ChatApiError>> = Vec::new();
    let mut rest = body;
    let mut sizes = sizes.iter().cycle();
    while !rest.is_empty() {
        let size = sizes.next().copied().unwrap_or(rest.len()).clamp(1, rest.len());
        let (chunk, tail) = rest.split_at(size);
        chunks.push(Ok(chunk.to_vec()));
        rest = tail;
    }
    RecordStream::new(stream::iter(chunks), cancel)
}

pub fn ndjson(records: &[Value]) -> String {
    records
        .iter()
        .map(|record| format!("{record}\n"))
        .collect()
}

pub fn step(response_id: &str, text: &str) -> Value {
    json!({ "responseId": response_id, "text": text })
}

pub fn screenshot_step(response_id: &str, call_id: &str, image: &str) -> Value {
    json!({
        "responseId": response_id,
        "text": "",
        "toolCalls": [
            { "type": "tool-call", "toolCallId": call_id, "toolName": "computer", "args": { "action": "screenshot" } }
        ],
        "toolResults": [
            {
                "type": "tool-result",
                "toolCallId": call_id,
                "toolName": "computer",
                "result": { "base64Image": image }
            }
        ]
    })
}

pub fn attached_session(config: SessionConfig) -> Session {
    let mut session = Session::new(config);
    session.attach_instance("inst-1");
    session
}

pub fn start(session: &mut Session, text: &str) -> Turn {
    match session.begin_turn(text) {
        Ok(Submission::Started(turn)) => turn,
        other => panic!("turn should start, got {other:?}"),
    }
}

/// Runs one turn over `body` and returns the outcome plus every event.
pub async fn run_turn(
    session: &mut Session,
    body: &str,
    sizes: &[usize],
) -> (TurnOutcome, Vec<SessionEvent>) {
    let turn = start(session, "go");
    let mut source = chunked_stream(body.as_bytes(), sizes, turn.cancel_signal());
    let mut events = Vec::new();
    let outcome = session
        .consume(turn, &mut source, &mut |event| events.push(event))
        .await;
    (outcome, events)
}

/// Transcript without the leading user message.
pub fn folded(session: &Session) -> Vec<Message> {
    session.transcript().messages()[1..].to_vec()
}
