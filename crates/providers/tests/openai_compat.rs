use rh_domain::tool::Message;
use rh_providers::{ChatRequest, LlmProvider, OpenAiCompatProvider, ProviderTarget};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> ChatRequest {
    ChatRequest {
        messages: vec![Message::system("be brief"), Message::user("hello")],
        ..Default::default()
    }
}

#[tokio::test]
async fn azure_request_uses_deployment_url_and_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/rh-gpt/chat/completions"))
        .and(query_param("api-version", "2024-06-01"))
        .and(header("api-key", "k-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o",
            "choices": [{"finish_reason": "stop", "message": {"content": "Hi there"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiCompatProvider::new(
        "azure",
        ProviderTarget::Azure {
            endpoint: server.uri(),
            api_key: "k-123".into(),
            deployment: "rh-gpt".into(),
            api_version: "2024-06-01".into(),
        },
        reqwest::Client::new(),
    );

    let resp = provider.chat(&request()).await.unwrap();
    assert_eq!(resp.content, "Hi there");
    assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn openai_request_uses_bearer_and_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": [{"message": {"content": "ok"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiCompatProvider::new(
        "openai",
        ProviderTarget::OpenAi {
            base_url: format!("{}/v1", server.uri()),
            api_key: "sk-1".into(),
            model: "gpt-4o-mini".into(),
        },
        reqwest::Client::new(),
    );

    let resp = provider.chat(&request()).await.unwrap();
    assert_eq!(resp.model, "gpt-4o-mini");
}

#[tokio::test]
async fn error_status_becomes_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let provider = OpenAiCompatProvider::new(
        "azure",
        ProviderTarget::Azure {
            endpoint: server.uri(),
            api_key: "wrong".into(),
            deployment: "d".into(),
            api_version: "2024-06-01".into(),
        },
        reqwest::Client::new(),
    );

    let err = provider.chat(&request()).await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("401"), "{text}");
    assert!(text.contains("bad key"), "{text}");
}
