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
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{EpisodeStore, HintWrite, StoreError};
use crate::model::{opaque_id, Episode, Feedback, HintRecord, NewEpisode, NewFeedback};

const RETURN_REPRESENTATION: &str = "return=representation";

#[derive(Debug, Deserialize)]
struct InsertedRow {
    #[serde(deserialize_with = "opaque_id")]
    id: String,
}

/// Store reached over a PostgREST endpoint (e.g. a hosted Supabase project),
/// authenticated with a service key.
#[derive(Debug, Clone)]
pub struct PostgrestEpisodeStore {
    client: Client,
    base_url: String,
    service_key: String,
}

impl PostgrestEpisodeStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Connection(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, StoreError> {
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| StoreError::Connection(format!("{context}: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message: rejection_message(&body),
        })
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<Vec<T>, StoreError> {
        self.send(request, context)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::Serialisation(format!("{context}: {e}")))
    }

    async fn insert_returning_id<B: serde::Serialize + ?Sized>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<String, StoreError> {
        let context = format!("insert into {table}");
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        let rows: Vec<InsertedRow> = self.rows(request, &context).await?;
        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| StoreError::Query(format!("{context}: no row returned")))
    }
}

/// PostgREST errors carry a JSON body with a `message`; fall back to the raw text.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl EpisodeStore for PostgrestEpisodeStore {
    async fn insert_episode(&self, episode: NewEpisode) -> Result<String, StoreError> {
        self.insert_returning_id("episodes", &episode).await
    }

    async fn fetch_episode(&self, episode_id: &str) -> Result<Option<Episode>, StoreError> {
        let request = self.client.get(self.table_url("episodes")).query(&[
            ("id", format!("eq.{episode_id}")),
            ("select", "*".to_string()),
        ]);
        let rows: Vec<Episode> = self.rows(request, "fetch episode").await?;
        Ok(rows.into_iter().next())
    }

    async fn record_hint(
        &self,
        episode_id: &str,
        hint: HintRecord,
    ) -> Result<HintWrite, StoreError> {
        let request = self
            .client
            .patch(self.table_url("episodes"))
            .query(&[
                ("id", format!("eq.{episode_id}")),
                ("or", "(hint_text.is.null,hint_text.eq.)".to_string()),
            ])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&json!({
                "hint_text": hint.hint_text,
                "leaked": hint.leaked,
                "tokens": hint.tokens,
                "hint_created_at": hint.hint_created_at,
            }));
        let updated: Vec<serde_json::Value> = self.rows(request, "record hint").await?;
        debug!(episode_id, updated = updated.len(), "conditional hint update applied");
        Ok(if updated.is_empty() {
            HintWrite::AlreadySet
        } else {
            HintWrite::Written
        })
    }

    async fn insert_feedback(&self, feedback: NewFeedback) -> Result<String, StoreError> {
        self.insert_returning_id("feedback", &feedback).await
    }

    async fn list_feedback(&self, episode_id: &str) -> Result<Vec<Feedback>, StoreError> {
        let request = self.client.get(self.table_url("feedback")).query(&[
            ("episode_id", format!("eq.{episode_id}")),
            ("select", "id,episode_id,reward,tag,guess".to_string()),
        ]);
        self.rows(request, "list feedback").await
    }

    fn backend_name(&self) -> &'static str {
        "postgrest"
    }
}
