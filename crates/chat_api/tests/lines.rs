use chat_api::lines::is_keepalive;
use chat_api::{classify_line, encode_line, LineDecoder, Record, KEEPALIVE_LINE};
use serde_json::json;

const BODY: &str = concat!(
    "{\"responseId\":\"r1\",\"text\":\"caf\u{e9} \u{1f600}\"}\n",
    ": flush\n",
    "\n",
    "{\"error\":\"Not enough agent credits\"}\n",
    "{\"role\":\"tool\",\"content\":[]}\r\n",
    "{\"dangling\":"
);

fn decode_in_chunks(body: &[u8], sizes: &[usize]) -> Vec<String> {
    let mut decoder = LineDecoder::default();
    let mut lines = Vec::new();
    let mut rest = body;
    let mut sizes = sizes.iter().cycle();

    while !rest.is_empty() {
        let size = (*sizes.next().expect("cycled sizes")).clamp(1, rest.len());
        let (chunk, tail) = rest.split_at(size);
        lines.extend(decoder.feed(chunk));
        rest = tail;
    }
    decoder.finish();
    lines
}

#[test]
fn chunk_boundaries_do_not_change_the_decoded_lines() {
    let whole = decode_in_chunks(BODY.as_bytes(), &[BODY.len()]);
    assert_eq!(whole.len(), 3);

    for sizes in [&[1][..], &[2, 5], &[3, 1, 7], &[13], &[64, 1]] {
        assert_eq!(decode_in_chunks(BODY.as_bytes(), sizes), whole, "sizes {sizes:?}");
    }
}

#[test]
fn multibyte_characters_split_across_chunks_survive() {
    let lines = decode_in_chunks(BODY.as_bytes(), &[1]);
    assert_eq!(
        classify_line(&lines[0]),
        Record::Payload(json!({"responseId": "r1", "text": "caf\u{e9} \u{1f600}"}))
    );
}

#[test]
fn keepalives_are_transparent() {
    let with_noise = LineDecoder::decode_all(": flush\n{\"text\":\"a\"}\n: flush\n:\n{\"text\":\"b\"}\n");
    let without_noise = LineDecoder::decode_all("{\"text\":\"a\"}\n{\"text\":\"b\"}\n");
    assert_eq!(with_noise, without_noise);
}

#[test]
fn trailing_partial_line_is_dropped() {
    let lines = LineDecoder::decode_all("{\"text\":\"a\"}\n{\"text\":");
    assert_eq!(lines, vec!["{\"text\":\"a\"}".to_string()]);
}

#[test]
fn encoded_lines_round_trip_through_the_decoder() {
    let mut body = encode_line(&json!({"text": "hi"})).expect("encode");
    body.push_str(KEEPALIVE_LINE);
    assert!(is_keepalive(KEEPALIVE_LINE));
    assert_eq!(LineDecoder::decode_all(&body), vec!["{\"text\":\"hi\"}".to_string()]);
}
