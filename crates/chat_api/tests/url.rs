use chat_api::normalize_chat_url;
use chat_api::url::{instance_endpoint, DEFAULT_CHAT_BASE_URL};

#[test]
fn url_normalization_keeps_existing_chat_endpoint() {
    assert_eq!(
        normalize_chat_url("https://agent.example.test/api/chat/"),
        "https://agent.example.test/api/chat"
    );
}

#[test]
fn url_normalization_appends_chat_to_api_base() {
    assert_eq!(
        normalize_chat_url("https://agent.example.test/api"),
        "https://agent.example.test/api/chat"
    );
}

#[test]
fn url_normalization_appends_api_chat_to_generic_base() {
    assert_eq!(
        normalize_chat_url("https://agent.example.test"),
        "https://agent.example.test/api/chat"
    );
    assert_eq!(
        normalize_chat_url("  "),
        format!("{DEFAULT_CHAT_BASE_URL}/api/chat")
    );
}

#[test]
fn instance_endpoint_rejects_unparseable_base() {
    assert!(instance_endpoint("not a url", &["start"]).is_err());
}
