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

use chrono::Utc;
use llm_contracts::LLMError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use wordpack::{leaks, normalise, token_count, TargetPick, WordCatalog};

use crate::hint::HintGenerator;
use crate::model::{HintOutcome, HintRecord, NewEpisode, NewFeedback, ScoreOutcome};
use crate::reward::score;
use crate::store::{EpisodeStore, HintWrite, StoreError};

#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error("{0} required")]
    MissingField(&'static str),

    #[error("word_id not in wordpack")]
    UnknownWord(String),

    #[error("episode {0} not found")]
    EpisodeNotFound(String),

    #[error("hint already exists")]
    HintAlreadyExists,

    #[error("no hint for this episode")]
    NoHintYet,

    #[error("hint generation failed: {0}")]
    UpstreamGeneration(#[from] LLMError),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// Drives an episode through its lifecycle: created with a target snapshot,
/// given exactly one hint, then scored any number of times.
pub struct EpisodeService {
    catalog: Arc<WordCatalog>,
    store: Arc<dyn EpisodeStore>,
    generator: HintGenerator,
    model_ckpt: String,
}

fn require<'a>(value: &'a str, fields: &'static str) -> Result<&'a str, EpisodeError> {
    let value = value.trim();
    if value.is_empty() {
        Err(EpisodeError::MissingField(fields))
    } else {
        Ok(value)
    }
}

fn tokens_of(text: &str) -> u32 {
    u32::try_from(token_count(text)).unwrap_or(u32::MAX)
}

impl EpisodeService {
    pub fn new(
        catalog: Arc<WordCatalog>,
        store: Arc<dyn EpisodeStore>,
        generator: HintGenerator,
        model_ckpt: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            store,
            generator,
            model_ckpt: model_ckpt.into(),
        }
    }

    pub fn catalog(&self) -> &WordCatalog {
        &self.catalog
    }

    pub fn pick_target(&self) -> TargetPick {
        self.catalog.pick_target()
    }

    /// The catalog entry is authoritative: its target and aliases are
    /// snapshotted into the episode. A differing caller target is ignored.
    ///
    /// Earlier deployments of this API stored the caller's target verbatim,
    /// so episode rows they wrote may disagree with the catalog.
    pub async fn create_episode(&self, word_id: &str, target: &str) -> Result<String, EpisodeError> {
        const FIELDS: &str = "word_id, target";
        let word_id = require(word_id, FIELDS)?;
        let target = require(target, FIELDS)?;

        let entry = self
            .catalog
            .get(word_id)
            .ok_or_else(|| EpisodeError::UnknownWord(word_id.to_string()))?;
        if normalise(target) != normalise(&entry.target) {
            warn!(word_id, supplied = target, catalog = %entry.target, "caller target differs from catalog, using catalog");
        }

        let episode_id = self
            .store
            .insert_episode(NewEpisode {
                word_id: entry.id.clone(),
                target: entry.target.clone(),
                aliases: entry.aliases.clone(),
                model_ckpt: self.model_ckpt.clone(),
            })
            .await?;
        info!(%episode_id, word_id, "episode created");
        Ok(episode_id)
    }

    /// Generates and stores the episode's one hint. Nothing is written unless
    /// the model call succeeds; a concurrent writer that got there first makes
    /// this call fail with `HintAlreadyExists`.
    pub async fn generate_hint(
        &self,
        episode_id: &str,
        target: &str,
    ) -> Result<HintOutcome, EpisodeError> {
        const FIELDS: &str = "episode_id, target";
        let episode_id = require(episode_id, FIELDS)?;
        let target = require(target, FIELDS)?;

        let episode = self
            .store
            .fetch_episode(episode_id)
            .await?
            .ok_or_else(|| EpisodeError::EpisodeNotFound(episode_id.to_string()))?;
        if episode.hint().is_some() {
            return Err(EpisodeError::HintAlreadyExists);
        }
        if normalise(target) != normalise(&episode.target) {
            warn!(episode_id, supplied = target, stored = %episode.target, "caller target differs from episode, using episode");
        }

        let hint_text = self.generator.generate(&episode.target).await?;
        let leaked = leaks(&hint_text, &episode.target, episode.aliases.as_slice());
        let tokens = tokens_of(&hint_text);

        let write = self
            .store
            .record_hint(
                episode_id,
                HintRecord {
                    hint_text: hint_text.clone(),
                    leaked,
                    tokens,
                    hint_created_at: Utc::now(),
                },
            )
            .await?;
        if write == HintWrite::AlreadySet {
            warn!(episode_id, "hint written concurrently, discarding generated hint");
            return Err(EpisodeError::HintAlreadyExists);
        }

        info!(episode_id, model = self.generator.model(), tokens, leaked, "hint recorded");
        Ok(HintOutcome {
            hint_text,
            tokens,
            leak: leaked,
        })
    }

    /// Scores the episode's hint and appends one feedback row. The leak check
    /// is re-run against the stored snapshot so a stale flag cannot hide a leak.
    pub async fn score_episode(
        &self,
        episode_id: &str,
        target: &str,
        solved: bool,
        guess: Option<String>,
    ) -> Result<ScoreOutcome, EpisodeError> {
        const FIELDS: &str = "episode_id, target";
        let episode_id = require(episode_id, FIELDS)?;
        require(target, FIELDS)?;

        let episode = self
            .store
            .fetch_episode(episode_id)
            .await?
            .ok_or_else(|| EpisodeError::EpisodeNotFound(episode_id.to_string()))?;
        let hint = episode.hint().ok_or(EpisodeError::NoHintYet)?;

        let did_leak =
            episode.leaked.unwrap_or(false) || leaks(hint, &episode.target, episode.aliases.as_slice());
        let total_tokens = episode
            .tokens
            .filter(|&tokens| tokens > 0)
            .unwrap_or_else(|| tokens_of(hint));

        let reward = score(did_leak, total_tokens, solved);
        let feedback_id = self
            .store
            .insert_feedback(NewFeedback {
                episode_id: episode_id.to_string(),
                reward: reward.value,
                tag: reward.tag,
                guess: guess.clone(),
            })
            .await?;

        info!(episode_id, %feedback_id, reward = reward.value, tag = %reward.tag, "feedback recorded");
        Ok(ScoreOutcome {
            feedback_id,
            reward: reward.value,
            tag: reward.tag,
            total_tokens,
            did_leak,
            guess,
        })
    }
}
