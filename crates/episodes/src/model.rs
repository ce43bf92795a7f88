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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One round: a target snapshot and, once generated, its single hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub word_id: String,
    pub target: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub hint_text: Option<String>,
    #[serde(default)]
    pub leaked: Option<bool>,
    #[serde(default)]
    pub tokens: Option<u32>,
    #[serde(default)]
    pub hint_created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model_ckpt: String,
}

impl Episode {
    /// The stored hint, treating a blank string as no hint.
    pub fn hint(&self) -> Option<&str> {
        self.hint_text
            .as_deref()
            .filter(|hint| !hint.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEpisode {
    pub word_id: String,
    pub target: String,
    pub aliases: Vec<String>,
    pub model_ckpt: String,
}

/// Fields written onto an episode, together and exactly once, by hint generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintRecord {
    pub hint_text: String,
    pub leaked: bool,
    pub tokens: u32,
    pub hint_created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardTag {
    #[serde(rename = "leak")]
    Leak,
    #[serde(rename = "auto_len")]
    AutoLen,
    #[serde(rename = "auto_len+solve")]
    AutoLenSolve,
}

impl RewardTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardTag::Leak => "leak",
            RewardTag::AutoLen => "auto_len",
            RewardTag::AutoLenSolve => "auto_len+solve",
        }
    }
}

impl fmt::Display for RewardTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(deserialize_with = "opaque_id")]
    pub episode_id: String,
    pub reward: f64,
    pub tag: RewardTag,
    #[serde(default)]
    pub guess: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub episode_id: String,
    pub reward: f64,
    pub tag: RewardTag,
    pub guess: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintOutcome {
    pub hint_text: String,
    pub tokens: u32,
    pub leak: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub feedback_id: String,
    pub reward: f64,
    pub tag: RewardTag,
    pub total_tokens: u32,
    #[serde(rename = "didLeak")]
    pub did_leak: bool,
    pub guess: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Row ids are opaque: accept uuid strings as well as integer keys.
pub(crate) fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or integer id, got {other}"
        ))),
    }
}
