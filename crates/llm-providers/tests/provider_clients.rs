// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use llm_contracts::{LLMError, ProviderRequest};
use llm_providers::{ApiClient, OllamaClient, OpenAIClient, RetryPolicy};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hint_request() -> ProviderRequest {
    ProviderRequest::chat(
        "mistral:latest",
        "Describe \"cat\", without using the word \"cat\"",
        "Target: cat\nWrite one short hint.",
    )
    .with_temperature(0.7)
}

#[tokio::test]
async fn ollama_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "mistral:latest",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "  Purrs on your lap.  " },
            "done": true,
            "prompt_eval_count": 20,
            "eval_count": 6
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(Some(server.uri()), Some(5), None).unwrap();
    let response = client.send_request(hint_request()).await.unwrap();

    assert_eq!(response.content, "  Purrs on your lap.  ");
    assert_eq!(response.usage.total_tokens, 26);
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn ollama_server_error_is_not_retried_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(Some(server.uri()), Some(5), None).unwrap();
    let err = client.send_request(hint_request()).await.unwrap_err();

    match err {
        LLMError::ServerError { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("model exploded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn ollama_retries_server_errors_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = OllamaClient::new(Some(server.uri()), Some(5), None)
        .unwrap()
        .with_retry_policy(RetryPolicy::new(2).with_base_delay(Duration::from_millis(1)));
    let err = client.send_request(hint_request()).await.unwrap_err();

    assert!(matches!(err, LLMError::ServerError { status: 503, .. }));
}

#[tokio::test]
async fn ollama_client_errors_stop_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(Some(server.uri()), Some(5), Some(3))
        .unwrap()
        .with_retry_policy(RetryPolicy::new(3).with_base_delay(Duration::from_millis(1)));
    assert!(client.send_request(hint_request()).await.is_err());
}

#[tokio::test]
async fn ollama_health_check_requires_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(Some(server.uri()), Some(5), None).unwrap();
    assert!(client.health_check().await.is_err());
}

#[tokio::test]
async fn openai_sends_bearer_and_reads_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "kitten" }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 30, "completion_tokens": 1, "total_tokens": 31 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAIClient::new(
        "sk-test".to_string(),
        Some(format!("{}/v1/chat/completions", server.uri())),
        Some(5),
        None,
    )
    .unwrap();
    let request = ProviderRequest::chat("gpt-4o-mini", "one word", "Hint: purrs").with_temperature(0.3);
    let response = client.send_request(request).await.unwrap();

    assert_eq!(response.content, "kitten");
    assert_eq!(response.usage.total_tokens, 31);
}

#[tokio::test]
async fn openai_unauthorised_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAIClient::new("nope".to_string(), Some(server.uri()), Some(5), None).unwrap();
    let err = client
        .send_request(ProviderRequest::chat("gpt-4o-mini", "s", "u"))
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::Authentication(_)));
}
