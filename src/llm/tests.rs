use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> LlmConfig {
    LlmConfig {
        base_url: base_url.to_string(),
        model: "test-model".to_string(),
        max_tokens: 128,
        api_key: "test-key".to_string(),
    }
}

#[test]
fn missing_api_key_is_a_config_error() {
    let config = LlmConfig {
        api_key: String::new(),
        ..LlmConfig::default()
    };

    let err = OpenAiChatClient::new(&config).expect_err("key is required");

    assert!(matches!(err, RagError::Config(_)));
}

#[tokio::test]
async fn completion_returns_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "test-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "Paris."}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        })))
        .mount(&server)
        .await;

    let client = OpenAiChatClient::new(&test_config(&server.uri())).expect("build client");
    let text = client.complete("capital of France?").await.expect("completion succeeds");

    assert_eq!(text, "Paris.");
}

#[tokio::test]
async fn empty_choices_is_an_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = OpenAiChatClient::new(&test_config(&server.uri())).expect("build client");
    let err = client.complete("anything").await.expect_err("no choices");

    assert!(matches!(err, RagError::Llm(_)));
}

#[tokio::test]
async fn service_error_surfaces_as_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = OpenAiChatClient::new(&test_config(&server.uri())).expect("build client");
    let err = client.complete("anything").await.expect_err("rate limited");

    assert!(matches!(err, RagError::Llm(_)));
    assert!(err.to_string().contains("429"));
}
