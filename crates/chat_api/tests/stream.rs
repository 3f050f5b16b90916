use std::time::Duration;

use agent_provider::{CancelReason, CancelSignal};
use chat_api::{ChatApiError, ErrorCategory, Record, RecordSource, RecordStream};
use futures_util::stream;
use futures_util::StreamExt;
use serde_json::json;

fn chunks(parts: &[&str]) -> Vec<Result<Vec<u8>, ChatApiError>> {
    parts.iter().map(|part| Ok(part.as_bytes().to_vec())).collect()
}

async fn drain(source: &mut impl RecordSource) -> Vec<Result<Record, ChatApiError>> {
    let mut out = Vec::new();
    while let Some(item) = source.next_record().await {
        out.push(item);
    }
    out
}

#[tokio::test]
async fn records_are_classified_across_chunk_boundaries() {
    let mut records = RecordStream::new(
        stream::iter(chunks(&[
            "{\"text\":\"he",
            "llo\"}\n: flush\n{\"error\":\"boom\"}\nnot json\n",
            "{\"role\":\"tool\",\"content\":[]}",
        ])),
        CancelSignal::new(),
    );

    let items = drain(&mut records).await;
    let items: Vec<Record> = items
        .into_iter()
        .map(|item| item.expect("no transport errors"))
        .collect();

    assert_eq!(items.len(), 3);
    assert_eq!(items[0], Record::Payload(json!({"text": "hello"})));
    assert_eq!(
        items[1],
        Record::InlineError {
            message: "boom".to_string(),
            category: ErrorCategory::Server,
        }
    );
    assert!(matches!(&items[2], Record::Malformed { raw, .. } if raw == "not json"));
    assert!(records.is_released());
}

#[tokio::test]
async fn inline_errors_do_not_end_the_stream() {
    let mut records = RecordStream::new(
        stream::iter(chunks(&[
            "{\"error\":\"Not enough agent credits\"}\n",
            "{\"text\":\"still here\"}\n",
        ])),
        CancelSignal::new(),
    );

    let items = drain(&mut records).await;
    assert_eq!(items.len(), 2);
    assert!(matches!(
        items[0],
        Ok(Record::InlineError {
            category: ErrorCategory::InsufficientCredits,
            ..
        })
    ));
    assert!(matches!(&items[1], Ok(Record::Payload(_))));
}

#[tokio::test]
async fn cancel_before_read_releases_without_reading() {
    let cancel = CancelSignal::new();
    cancel.cancel(CancelReason::InstanceTerminated);
    let mut records = RecordStream::new(stream::iter(chunks(&["{\"text\":\"a\"}\n"])), cancel);

    let first = records.next_record().await.expect("cancellation is reported");
    assert_eq!(
        first.expect_err("cancelled").cancel_reason(),
        Some(CancelReason::InstanceTerminated)
    );
    assert!(records.next_record().await.is_none());
    assert_eq!(records.reads(), 0);
    assert!(records.is_released());
}

#[tokio::test]
async fn cancel_mid_chunk_still_yields_the_rest_of_that_chunk() {
    let cancel = CancelSignal::new();
    let mut records = RecordStream::new(
        stream::iter(chunks(&[
            "{\"text\":\"a\"}\n{\"text\":\"b\"}\n",
            "{\"text\":\"c\"}\n",
        ])),
        cancel.clone(),
    );

    let first = records.next_record().await.expect("first").expect("payload");
    assert_eq!(first, Record::Payload(json!({"text": "a"})));
    cancel.cancel(CancelReason::UserAbort);

    let second = records.next_record().await.expect("second").expect("payload");
    assert_eq!(second, Record::Payload(json!({"text": "b"})));

    let third = records.next_record().await.expect("cancel");
    assert!(third.expect_err("cancelled").is_cancelled());
    assert!(records.next_record().await.is_none());
    assert_eq!(records.reads(), 1);
}

#[tokio::test]
async fn cancel_is_observed_while_a_read_is_pending() {
    let cancel = CancelSignal::new();
    let body = stream::iter(chunks(&["{\"text\":\"a\"}\n"])).chain(stream::pending());
    let mut records = RecordStream::new(body, cancel.clone());

    assert!(records.next_record().await.expect("first").is_ok());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel(CancelReason::Completed);
    });

    let outcome = tokio::time::timeout(Duration::from_secs(2), records.next_record())
        .await
        .expect("pending read must observe cancellation")
        .expect("cancellation is reported");
    assert_eq!(
        outcome.expect_err("cancelled").cancel_reason(),
        Some(CancelReason::Completed)
    );
    assert!(records.is_released());
}

#[tokio::test]
async fn transport_errors_end_the_stream() {
    let body = stream::iter(vec![
        Ok(b"{\"text\":\"a\"}\n".to_vec()),
        Err(ChatApiError::StreamRead("connection dropped".to_string())),
        Ok(b"{\"text\":\"never\"}\n".to_vec()),
    ]);
    let mut records = RecordStream::new(body, CancelSignal::new());

    let items = drain(&mut records).await;
    assert_eq!(items.len(), 2);
    assert!(matches!(items[1], Err(ChatApiError::StreamRead(_))));
}
