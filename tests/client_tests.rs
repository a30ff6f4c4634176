//! OpenAiClient wire-format tests against a mock server.

use colloquy::client::{LlmClient, OpenAiClient, ToolSpec};
use colloquy::error::ColloquyError;
use colloquy::types::ChatTurn;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new("gpt-4o-mini", "sk-test".to_string(), Some(server.uri()))
}

fn calculator_spec() -> ToolSpec {
    ToolSpec {
        name: "calculator".into(),
        description: "Perform basic arithmetic".into(),
        parameters: json!({"type": "object", "properties": {}}),
    }
}

#[tokio::test]
async fn plain_completion_with_usage_and_cost() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "hi there"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        })))
        .mount(&server)
        .await;

    let completion = client_for(&server)
        .complete(&[ChatTurn::user("hello")], &[])
        .await
        .unwrap();

    assert_eq!(completion.content, "hi there");
    assert!(completion.tool_call.is_none());
    let usage = completion.usage.unwrap();
    assert_eq!(usage.total_tokens, 13);
    // gpt-4o-mini pricing: 10 in at $0.15/M plus 3 out at $0.60/M.
    let expected = 10.0 * 0.15 / 1e6 + 3.0 * 0.6 / 1e6;
    assert!((usage.cost - expected).abs() < 1e-12);
}

#[tokio::test]
async fn tool_call_is_extracted_with_parsed_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "calculator",
                        "arguments": "{\"op\":\"add\",\"a\":2,\"b\":3}"
                    }
                }]
            }}],
            "usage": {"prompt_tokens": 25, "completion_tokens": 12, "total_tokens": 37}
        })))
        .mount(&server)
        .await;

    let completion = client_for(&server)
        .complete(&[ChatTurn::user("2 + 3?")], &[calculator_spec()])
        .await
        .unwrap();

    assert_eq!(completion.content, "");
    let call = completion.tool_call.unwrap();
    assert_eq!(call.name, "calculator");
    assert_eq!(call.arguments["op"], "add");
    assert_eq!(call.arguments["a"], 2);
}

#[tokio::test]
async fn unparseable_arguments_fall_back_to_raw_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "calculator", "arguments": "{broken"}
                }]
            }}]
        })))
        .mount(&server)
        .await;

    let completion = client_for(&server)
        .complete(&[ChatTurn::user("hm")], &[calculator_spec()])
        .await
        .unwrap();

    let call = completion.tool_call.unwrap();
    assert_eq!(call.arguments, serde_json::Value::String("{broken".into()));
}

#[tokio::test]
async fn missing_usage_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .mount(&server)
        .await;

    let completion = client_for(&server)
        .complete(&[ChatTurn::user("hi")], &[])
        .await
        .unwrap();
    assert!(completion.usage.is_none());
}

#[tokio::test]
async fn auth_rejection_maps_to_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete(&[ChatTurn::user("hi")], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ColloquyError::Upstream(_)));
}

#[tokio::test]
async fn server_error_maps_to_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete(&[ChatTurn::user("hi")], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ColloquyError::Upstream(_)));
}

#[tokio::test]
async fn empty_choices_is_an_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete(&[ChatTurn::user("hi")], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ColloquyError::Upstream(_)));
}

#[tokio::test]
async fn tool_specs_are_sent_as_function_definitions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "tools": [{"type": "function", "function": {"name": "calculator"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .mount(&server)
        .await;

    let completion = client_for(&server)
        .complete(&[ChatTurn::user("hi")], &[calculator_spec()])
        .await
        .unwrap();
    assert_eq!(completion.content, "ok");
}
