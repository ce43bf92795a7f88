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
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{debug, info};
use uuid::Uuid;

use super::{EpisodeStore, HintWrite, StoreError};
use crate::model::{Episode, Feedback, HintRecord, NewEpisode, NewFeedback, RewardTag};

const SCHEMA: &str = "
    DEFINE TABLE IF NOT EXISTS episodes SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS episodes_key ON TABLE episodes FIELDS key UNIQUE;
    DEFINE TABLE IF NOT EXISTS feedback SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS feedback_episode ON TABLE feedback FIELDS episode_id;
";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurrealSettings {
    /// Any engine URL: `mem://`, `ws://host:8000`, `rocksdb://path`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for SurrealSettings {
    fn default() -> Self {
        Self {
            url: "mem://".to_string(),
            namespace: "hintgym".to_string(),
            database: "episodes".to_string(),
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EpisodeRow {
    key: String,
    word_id: String,
    target: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hint_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    leaked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hint_created_at: Option<String>,
    model_ckpt: String,
}

impl EpisodeRow {
    fn into_episode(self) -> Result<Episode, StoreError> {
        let hint_created_at = self
            .hint_created_at
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|e| StoreError::Serialisation(format!("bad hint_created_at: {e}")))
            })
            .transpose()?;
        Ok(Episode {
            id: self.key,
            word_id: self.word_id,
            target: self.target,
            aliases: self.aliases,
            hint_text: self.hint_text,
            leaked: self.leaked,
            tokens: self.tokens,
            hint_created_at,
            model_ckpt: self.model_ckpt,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FeedbackRow {
    key: String,
    episode_id: String,
    reward: f64,
    tag: RewardTag,
    #[serde(default)]
    guess: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatedKey {
    #[allow(dead_code)]
    key: String,
}

fn query_error(context: &str) -> impl FnOnce(surrealdb::Error) -> StoreError + '_ {
    move |e| StoreError::Query(format!("{context}: {e}"))
}

/// SurrealDB-backed store. Records are keyed by a generated uuid that is
/// also kept in the `key` field, which is the id handed to callers.
#[derive(Clone)]
pub struct SurrealEpisodeStore {
    db: Surreal<Any>,
}

impl SurrealEpisodeStore {
    pub async fn connect(settings: &SurrealSettings) -> Result<Self, StoreError> {
        let db = any::connect(settings.url.as_str())
            .await
            .map_err(|e| StoreError::Connection(format!("failed to open {}: {e}", settings.url)))?;

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await
            .map_err(|e| StoreError::Connection(format!("failed to authenticate: {e}")))?;
        }

        db.use_ns(settings.namespace.as_str())
            .use_db(settings.database.as_str())
            .await
            .map_err(|e| {
                StoreError::Connection(format!("failed to select namespace/database: {e}"))
            })?;

        let store = Self { db };
        store.initialise_schema().await?;
        info!(url = %settings.url, ns = %settings.namespace, db = %settings.database, "surreal episode store ready");
        Ok(store)
    }

    /// Fresh in-memory database, isolated per call.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect(&SurrealSettings::default()).await
    }

    async fn initialise_schema(&self) -> Result<(), StoreError> {
        self.db
            .query(SCHEMA)
            .await
            .map_err(query_error("failed to apply schema"))?
            .check()
            .map_err(query_error("failed to apply schema"))?;
        debug!("episode schema applied");
        Ok(())
    }
}

#[async_trait]
impl EpisodeStore for SurrealEpisodeStore {
    async fn insert_episode(&self, episode: NewEpisode) -> Result<String, StoreError> {
        let key = Uuid::new_v4().to_string();
        let row = EpisodeRow {
            key: key.clone(),
            word_id: episode.word_id,
            target: episode.target,
            aliases: episode.aliases,
            hint_text: None,
            leaked: None,
            tokens: None,
            hint_created_at: None,
            model_ckpt: episode.model_ckpt,
        };
        self.db
            .query("CREATE type::thing('episodes', $key) CONTENT $row RETURN NONE")
            .bind(("key", key.clone()))
            .bind(("row", row))
            .await
            .map_err(query_error("failed to insert episode"))?
            .check()
            .map_err(query_error("failed to insert episode"))?;
        Ok(key)
    }

    async fn fetch_episode(&self, episode_id: &str) -> Result<Option<Episode>, StoreError> {
        let mut response = self
            .db
            .query("SELECT key, word_id, target, aliases, hint_text, leaked, tokens, hint_created_at, model_ckpt
                 FROM type::thing('episodes', $key)")
            .bind(("key", episode_id.to_string()))
            .await
            .map_err(query_error("failed to fetch episode"))?;
        let row: Option<EpisodeRow> = response
            .take(0)
            .map_err(|e| StoreError::Serialisation(format!("failed to decode episode: {e}")))?;
        row.map(EpisodeRow::into_episode).transpose()
    }

    async fn record_hint(
        &self,
        episode_id: &str,
        hint: HintRecord,
    ) -> Result<HintWrite, StoreError> {
        let mut response = self
            .db
            .query(
                "UPDATE type::thing('episodes', $key) SET
                    hint_text = $hint_text,
                    leaked = $leaked,
                    tokens = $tokens,
                    hint_created_at = $hint_created_at
                 WHERE hint_text = NONE OR hint_text = NULL OR hint_text = ''
                 RETURN key",
            )
            .bind(("key", episode_id.to_string()))
            .bind(("hint_text", hint.hint_text))
            .bind(("leaked", hint.leaked))
            .bind(("tokens", hint.tokens))
            .bind(("hint_created_at", hint.hint_created_at.to_rfc3339()))
            .await
            .map_err(query_error("failed to record hint"))?;
        let updated: Vec<UpdatedKey> = response
            .take(0)
            .map_err(|e| StoreError::Serialisation(format!("failed to decode update: {e}")))?;
        Ok(if updated.is_empty() {
            HintWrite::AlreadySet
        } else {
            HintWrite::Written
        })
    }

    async fn insert_feedback(&self, feedback: NewFeedback) -> Result<String, StoreError> {
        let key = Uuid::new_v4().to_string();
        let row = FeedbackRow {
            key: key.clone(),
            episode_id: feedback.episode_id,
            reward: feedback.reward,
            tag: feedback.tag,
            guess: feedback.guess,
        };
        self.db
            .query("CREATE type::thing('feedback', $key) CONTENT $row RETURN NONE")
            .bind(("key", key.clone()))
            .bind(("row", row))
            .await
            .map_err(query_error("failed to insert feedback"))?
            .check()
            .map_err(query_error("failed to insert feedback"))?;
        Ok(key)
    }

    async fn list_feedback(&self, episode_id: &str) -> Result<Vec<Feedback>, StoreError> {
        let mut response = self
            .db
            .query("SELECT key, episode_id, reward, tag, guess FROM feedback WHERE episode_id = $episode_id")
            .bind(("episode_id", episode_id.to_string()))
            .await
            .map_err(query_error("failed to list feedback"))?;
        let rows: Vec<FeedbackRow> = response
            .take(0)
            .map_err(|e| StoreError::Serialisation(format!("failed to decode feedback: {e}")))?;
        Ok(rows
            .into_iter()
            .map(|row| Feedback {
                id: row.key,
                episode_id: row.episode_id,
                reward: row.reward,
                tag: row.tag,
                guess: row.guess,
            })
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "surreal"
    }
}
