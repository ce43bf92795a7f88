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

use llm_contracts::{LLMError, LLMResult};
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry with exponential backoff and full jitter.
///
/// The default policy never retries: a single upstream failure is returned to
/// the caller as-is. Every attempt happens before the caller commits anything,
/// so raising `max_retries` cannot produce partial writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Upper bound of the sleep before retry number `attempt` (0-based).
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt).as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
    }
}

/// Maps a non-success status to the error the caller sees. Whether it is
/// retried follows from `LLMError::is_transient`.
fn status_error(provider: &str, status: StatusCode, body: String) -> LLMError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimit,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LLMError::Authentication(format!("{provider} API error {status}: {body}"))
        }
        s if s.is_server_error() => LLMError::ServerError {
            status: s.as_u16(),
            message: format!("{provider}: {body}"),
        },
        _ => LLMError::Provider(format!("{provider} API error {status}: {body}")),
    }
}

/// POSTs `payload` as JSON and returns the decoded JSON body of the first
/// successful response.
pub(crate) async fn post_json(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    payload: &Value,
    timeout: Duration,
    policy: RetryPolicy,
    provider: &'static str,
) -> LLMResult<Value> {
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let wait = policy.delay(attempt - 1);
            debug!(provider, attempt, ?wait, "backing off before retry");
            tokio::time::sleep(wait).await;
        }

        let mut request = client
            .post(url)
            .header("content-type", "application/json")
            .json(payload);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let error = match tokio::time::timeout(timeout, request.send()).await {
            Ok(Ok(resp)) => {
                let status = resp.status();
                debug!(provider, %status, "received model response");

                if status.is_success() {
                    return resp.json::<Value>().await.map_err(|e| {
                        LLMError::Serialisation(format!("Failed to parse JSON response: {e}"))
                    });
                }

                let body = resp.text().await.unwrap_or_default();
                status_error(provider, status, body)
            }
            Ok(Err(e)) => LLMError::Network(format!("Request failed: {e}")),
            Err(_) => LLMError::Timeout,
        };

        if !error.is_transient() {
            return Err(error);
        }
        warn!(provider, error = %error, attempt = attempt + 1, "model request failed");
        last_error = Some(error);
    }

    Err(last_error.unwrap_or_else(|| LLMError::Internal("Unknown error".to_string())))
}
