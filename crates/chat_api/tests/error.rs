use reqwest::StatusCode;

use chat_api::error::parse_error_message;

#[test]
fn parse_error_message_reads_credit_errors() {
    let body = r#"{"error":"Not enough agent credits"}"#;
    let message = parse_error_message(StatusCode::PAYMENT_REQUIRED, body);
    assert_eq!(message, "Not enough agent credits");
}

#[test]
fn parse_error_message_falls_back_to_raw_body() {
    let body = "raw failure text";
    let message = parse_error_message(StatusCode::INTERNAL_SERVER_ERROR, body);
    assert_eq!(message, "raw failure text");
}
