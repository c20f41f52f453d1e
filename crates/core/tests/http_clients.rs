use docqa_core::{
    ChatCompletionsClient, ChatCompletionsConfig, ChatMessage, Completer, Embedder, Generator,
    GeneratorConfig, HttpEmbedder, HttpEmbedderConfig, SearchError,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_client(server: &MockServer) -> Result<ChatCompletionsClient, SearchError> {
    ChatCompletionsClient::with_api_key(
        ChatCompletionsConfig {
            endpoint: format!("{}/v1", server.uri()),
            ..ChatCompletionsConfig::default()
        },
        "test-key",
    )
}

fn embedder(server: &MockServer, dimensions: usize) -> Result<HttpEmbedder, SearchError> {
    HttpEmbedder::new(HttpEmbedderConfig {
        endpoint: format!("{}/v1", server.uri()),
        model: "mini".to_string(),
        dimensions,
        ..HttpEmbedderConfig::default()
    })
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn chat_rate_limit_becomes_upstream_error() -> Result<(), SearchError> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string(r#"{"error":"quota"}"#))
        .mount(&server)
        .await;

    let result = chat_client(&server)?
        .complete("model", &[ChatMessage::user("hi")], 0.0)
        .await;

    match result {
        Err(SearchError::Upstream { backend, details }) => {
            assert_eq!(backend, "chat-completions");
            assert!(details.starts_with("429"), "details: {details}");
            assert!(details.contains(r#"{"error":"quota"}"#));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn chat_reply_is_sent_with_bearer_and_trimmed_by_generator() -> Result<(), SearchError> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "qa-model",
            "temperature": 0.0,
            "messages": [{ "role": "user" }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  What is X?\n")))
        .expect(2)
        .mount(&server)
        .await;

    let client = chat_client(&server)?;
    let raw = client
        .complete("qa-model", &[ChatMessage::user("x?")], 0.0)
        .await?;
    assert_eq!(raw, "  What is X?\n");

    let generator = Generator::new(
        client,
        GeneratorConfig {
            qa_model: "qa-model".to_string(),
            ..GeneratorConfig::default()
        },
    );
    assert_eq!(generator.rewrite_query("x?").await?, "What is X?");
    Ok(())
}

#[tokio::test]
async fn chat_reply_without_content_is_invalid() -> Result<(), SearchError> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let result = chat_client(&server)?
        .complete("model", &[ChatMessage::user("hi")], 0.2)
        .await;

    assert!(matches!(result, Err(SearchError::InvalidResponse { .. })));
    Ok(())
}

#[tokio::test]
async fn embeddings_of_wrong_width_are_rejected() -> Result<(), SearchError> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3] }]
        })))
        .mount(&server)
        .await;

    let result = embedder(&server, 2)?
        .embed_batch(&["some text".to_string()])
        .await;

    assert!(matches!(
        result,
        Err(SearchError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    ));
    Ok(())
}

#[tokio::test]
async fn embeddings_are_requested_in_one_batch_and_ordered() -> Result<(), SearchError> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({ "model": "mini", "input": ["a", "b"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] },
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vectors = embedder(&server, 2)?
        .embed_batch(&["a".to_string(), "b".to_string()])
        .await?;

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    Ok(())
}

#[tokio::test]
async fn embeddings_server_error_becomes_upstream_error() -> Result<(), SearchError> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = embedder(&server, 2)?.embed_query("question").await;

    match result {
        Err(SearchError::Upstream { backend, details }) => {
            assert_eq!(backend, "embeddings");
            assert!(details.contains("503"));
            assert!(details.contains("overloaded"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
    Ok(())
}
