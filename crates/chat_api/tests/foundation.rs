use agent_provider::{InstanceType, Message};
use serde_json::json;

use chat_api::{normalize_chat_url, ChatApiClient, ChatApiConfig, ChatRequest};

#[test]
fn smoke_client_constructs_from_config() {
    let config = ChatApiConfig::new("key-1")
        .with_base_url("https://agent.example.test")
        .with_user_agent("tests");

    let client = ChatApiClient::new(config).expect("client creation should succeed");
    assert_eq!(
        normalize_chat_url("https://agent.example.test"),
        client.normalized_endpoint()
    );
    assert_eq!("key-1", client.config().api_key);
    assert_eq!(Some("tests".to_string()), client.config().user_agent);
}

#[test]
fn chat_request_uses_camel_case_wire_names() {
    let request = ChatRequest::new(
        "key-1",
        "inst-1",
        InstanceType::Browser,
        "claude-3-7-sonnet",
        vec![Message::user_text("open the docs")],
    );

    assert_eq!(
        serde_json::to_value(&request).expect("request serializes"),
        json!({
            "apiKey": "key-1",
            "instanceId": "inst-1",
            "instanceType": "browser",
            "modelName": "claude-3-7-sonnet",
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": "open the docs"}]}
            ]
        })
    );
}
