use huddle_llm::{GeminiClient, GenerateRequest, GenerationOptions, GenerativeClient, GenerativeError, Turn};
use mockito::Matcher;
use serde_json::json;

fn client_for(server: &mockito::Server) -> GeminiClient {
    GeminiClient::new("test-key").unwrap().with_base_url(server.url())
}

#[tokio::test]
async fn test_generate_returns_candidate_text() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-pro:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJson(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Hi " }, { "text": "there" }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = client_for(&server)
        .generate(GenerateRequest::prompt("gemini-pro", "Hello"))
        .await
        .unwrap();

    assert_eq!(response.text, "Hi there");
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    assert_eq!(response.usage.unwrap().total_tokens, 5);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_history_alternates_roles() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-pro:generateContent")
        .match_body(Matcher::PartialJson(json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "a\n\nb" }] },
                { "role": "model", "parts": [{ "text": "c" }] },
                { "role": "user", "parts": [{ "text": "d" }] }
            ],
            "generationConfig": { "topK": 40 }
        })))
        .with_status(200)
        .with_body(json!({ "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }] }).to_string())
        .create_async()
        .await;

    let turns = vec![Turn::user("a"), Turn::user("b"), Turn::model("c"), Turn::user("d")];
    let request = GenerateRequest::new("gemini-pro", turns).with_options(GenerationOptions::chat_defaults());
    let response = client_for(&server).generate(request).await.unwrap();

    assert_eq!(response.text, "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_error_is_structured() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/models/gemini-pro:generateContent")
        .with_status(403)
        .with_body(json!({ "error": { "code": 403, "message": "API key not valid" } }).to_string())
        .create_async()
        .await;

    let err = client_for(&server)
        .generate(GenerateRequest::prompt("gemini-pro", "Hello"))
        .await
        .unwrap_err();

    match err {
        GenerativeError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blocked_prompt() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/models/gemini-pro:generateContent")
        .with_status(200)
        .with_body(json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string())
        .create_async()
        .await;

    let err = client_for(&server)
        .generate(GenerateRequest::prompt("gemini-pro", "something"))
        .await
        .unwrap_err();

    assert!(matches!(err, GenerativeError::Blocked(reason) if reason == "SAFETY"));
}

#[tokio::test]
async fn test_empty_candidates() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/models/gemini-pro:generateContent")
        .with_status(200)
        .with_body(json!({ "candidates": [] }).to_string())
        .create_async()
        .await;

    let err = client_for(&server)
        .generate(GenerateRequest::prompt("gemini-pro", "Hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, GenerativeError::EmptyResponse));
}
