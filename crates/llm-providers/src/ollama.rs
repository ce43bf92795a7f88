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

use async_trait::async_trait;
use llm_contracts::{LLMError, LLMResult, ProviderRequest, ProviderResponse, Usage};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::retry::{post_json, RetryPolicy};
use super::ApiClient;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OllamaClient {
    pub fn new(
        base_url: Option<String>,
        timeout_seconds: Option<u32>,
        max_retries: Option<u32>,
    ) -> LLMResult<Self> {
        let timeout = Duration::from_secs(timeout_seconds.unwrap_or(60).into());
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LLMError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| "http://127.0.0.1:11434".to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout,
            retry: RetryPolicy::new(max_retries.unwrap_or(0)),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_ollama_payload(&self, request: &ProviderRequest) -> Value {
        let mut payload = json!({
            "model": request.model,
            "messages": request.messages.iter().map(|msg| {
                json!({
                    "role": msg.role,
                    "content": msg.content
                })
            }).collect::<Vec<_>>(),
            "stream": false
        });

        let mut options = serde_json::Map::new();
        if let Some(max_tokens) = request.max_tokens {
            options.insert("num_predict".into(), json!(max_tokens));
        }
        if let Some(temperature) = request.temperature {
            options.insert("temperature".into(), json!(temperature));
        }
        if let Some(top_p) = request.top_p {
            options.insert("top_p".into(), json!(top_p));
        }
        if let Some(stop) = &request.stop_sequences {
            options.insert("stop".into(), json!(stop));
        }
        if !options.is_empty() {
            payload["options"] = Value::Object(options);
        }

        for (key, value) in &request.provider_specific {
            payload[key] = value.clone();
        }

        payload
    }

    fn parse_ollama_response(
        &self,
        response_data: Value,
        model: String,
    ) -> LLMResult<ProviderResponse> {
        let content = response_data["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                LLMError::Provider("Failed to extract content from Ollama response".to_string())
            })?;

        let usage = Usage::new(
            response_data["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            response_data["eval_count"].as_u64().unwrap_or(0) as u32,
        );

        let finish_reason = if response_data["done"].as_bool().unwrap_or(false) {
            Some("stop".to_string())
        } else {
            None
        };

        Ok(ProviderResponse {
            content: content.to_string(),
            model,
            usage,
            finish_reason,
            raw_response: response_data,
        })
    }
}

#[async_trait]
impl ApiClient for OllamaClient {
    async fn send_request(&self, request: ProviderRequest) -> LLMResult<ProviderResponse> {
        let payload = self.build_ollama_payload(&request);
        let url = format!("{}/api/chat", self.base_url);
        let response_data = post_json(
            &self.client,
            &url,
            None,
            &payload,
            self.timeout,
            self.retry,
            self.provider_name(),
        )
        .await?;
        self.parse_ollama_response(response_data, request.model)
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    async fn health_check(&self) -> LLMResult<()> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LLMError::Network(format!("Failed to connect to Ollama: {e}")))?;

        if !response.status().is_success() {
            return Err(LLMError::Provider(format!(
                "Ollama health check failed: {}",
                response.status()
            )));
        }

        let models_data: Value = response.json().await.map_err(|e| {
            LLMError::Serialisation(format!("Failed to parse models response: {e}"))
        })?;

        let Some(models) = models_data["models"].as_array() else {
            return Err(LLMError::Provider(
                "Invalid response format from Ollama /api/tags".to_string(),
            ));
        };
        if models.is_empty() {
            warn!("Ollama is running but no models are available");
            return Err(LLMError::Provider(
                "No models available in Ollama".to_string(),
            ));
        }

        let model_names: Vec<&str> = models
            .iter()
            .filter_map(|model| model["name"].as_str())
            .collect();
        debug!(?model_names, "Ollama health check successful");
        info!("Ollama connected with {} models available", model_names.len());
        Ok(())
    }
}
