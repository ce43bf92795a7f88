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

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiCallError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned {status}: {body}")]
    Status {
        path: &'static str,
        status: StatusCode,
        body: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextTarget {
    pub target: String,
    pub word_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HintReply {
    pub hint_text: String,
    pub tokens: u32,
    pub leak: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardReply {
    pub reward: f64,
    pub tag: String,
}

#[derive(Deserialize)]
struct Created {
    episode_id: String,
}

#[derive(Serialize)]
struct AutoReward<'a> {
    episode_id: &'a str,
    target: &'a str,
    solved: bool,
    guess: Option<&'a str>,
}

/// Thin typed client for the four hint-gym endpoints.
#[derive(Debug, Clone)]
pub struct HintGymApi {
    client: Client,
    base_url: String,
}

impl HintGymApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn read<T: DeserializeOwned>(
        path: &'static str,
        response: reqwest::Response,
    ) -> Result<T, ApiCallError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiCallError::Status { path, status, body });
        }
        response
            .json()
            .await
            .map_err(|source| ApiCallError::Transport { path, source })
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &'static str,
        body: &B,
    ) -> Result<T, ApiCallError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|source| ApiCallError::Transport { path, source })?;
        Self::read(path, response).await
    }

    pub async fn next_target(&self) -> Result<NextTarget, ApiCallError> {
        const PATH: &str = "/api/next-target";
        let response = self
            .client
            .get(format!("{}{PATH}", self.base_url))
            .send()
            .await
            .map_err(|source| ApiCallError::Transport { path: PATH, source })?;
        Self::read(PATH, response).await
    }

    pub async fn create_episode(&self, word_id: &str, target: &str) -> Result<String, ApiCallError> {
        let created: Created = self
            .post("/api/episode", &json!({ "word_id": word_id, "target": target }))
            .await?;
        Ok(created.episode_id)
    }

    pub async fn hint(&self, episode_id: &str, target: &str) -> Result<HintReply, ApiCallError> {
        self.post("/api/hint", &json!({ "episode_id": episode_id, "target": target }))
            .await
    }

    pub async fn auto_reward(
        &self,
        episode_id: &str,
        target: &str,
        solved: bool,
        guess: Option<&str>,
    ) -> Result<RewardReply, ApiCallError> {
        self.post(
            "/api/auto-reward",
            &AutoReward {
                episode_id,
                target,
                solved,
                guess,
            },
        )
        .await
    }
}
