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

//! Durable record of episodes and feedback rows.

pub mod postgrest;
pub mod surreal;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Episode, Feedback, HintRecord, NewEpisode, NewFeedback};

pub use postgrest::PostgrestEpisodeStore;
pub use surreal::{SurrealEpisodeStore, SurrealSettings};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store query failed: {0}")]
    Query(String),

    #[error("store serialisation error: {0}")]
    Serialisation(String),

    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Result of the conditional hint write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintWrite {
    Written,
    /// The episode already carried a hint; nothing was changed.
    AlreadySet,
}

#[async_trait]
pub trait EpisodeStore: Send + Sync {
    /// Inserts a new episode and returns its store-assigned id.
    async fn insert_episode(&self, episode: NewEpisode) -> Result<String, StoreError>;

    async fn fetch_episode(&self, episode_id: &str) -> Result<Option<Episode>, StoreError>;

    /// Writes the hint fields only if the episode has no hint yet, as a
    /// single atomic conditional update.
    async fn record_hint(&self, episode_id: &str, hint: HintRecord)
        -> Result<HintWrite, StoreError>;

    async fn insert_feedback(&self, feedback: NewFeedback) -> Result<String, StoreError>;

    async fn list_feedback(&self, episode_id: &str) -> Result<Vec<Feedback>, StoreError>;

    fn backend_name(&self) -> &'static str;
}
