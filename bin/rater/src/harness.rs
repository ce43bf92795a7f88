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

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use wordpack::WordCatalog;

use crate::api::HintGymApi;
use crate::grader::Grader;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub attempted: u32,
    pub failed: u32,
    pub leaked: u32,
    pub solved: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Round {
    Leaked,
    Graded { solved: bool },
}

pub struct Harness {
    api: HintGymApi,
    grader: Grader,
    catalog: Arc<WordCatalog>,
}

impl Harness {
    pub fn new(api: HintGymApi, grader: Grader, catalog: Arc<WordCatalog>) -> Self {
        Self {
            api,
            grader,
            catalog,
        }
    }

    async fn round(&self) -> Result<Round> {
        let pick = self.api.next_target().await?;
        let entry = self
            .catalog
            .get(&pick.word_id)
            .ok_or_else(|| anyhow!("word_id not in wordpack: {}", pick.word_id))?;

        let episode_id = self.api.create_episode(&pick.word_id, &pick.target).await?;
        let hint = self.api.hint(&episode_id, &pick.target).await?;

        if hint.leak {
            self.api
                .auto_reward(&episode_id, &pick.target, false, None)
                .await?;
            info!(%episode_id, word_id = %pick.word_id, "hint leaked the target");
            return Ok(Round::Leaked);
        }

        let guess = self
            .grader
            .guess(&hint.hint_text)
            .await
            .context("grading model")?;
        let solved = entry.accepts(&guess);
        let reward = self
            .api
            .auto_reward(&episode_id, &pick.target, solved, Some(&guess))
            .await?;
        info!(
            %episode_id,
            word_id = %pick.word_id,
            tokens = hint.tokens,
            %guess,
            solved,
            reward = reward.reward,
            tag = %reward.tag,
            "episode rated"
        );
        Ok(Round::Graded { solved })
    }

    /// Runs `episodes` rounds back to back. A failed round is logged and
    /// counted; it never stops the run.
    pub async fn run(&self, episodes: u32) -> Summary {
        let mut summary = Summary::default();
        for n in 1..=episodes {
            summary.attempted += 1;
            match self.round().await {
                Ok(Round::Leaked) => summary.leaked += 1,
                Ok(Round::Graded { solved }) => summary.solved += u32::from(solved),
                Err(e) => {
                    summary.failed += 1;
                    error!(episode = n, error = %format!("{e:#}"), "episode failed");
                }
            }
        }
        info!(
            attempted = summary.attempted,
            failed = summary.failed,
            leaked = summary.leaked,
            solved = summary.solved,
            "rating run finished"
        );
        summary
    }
}
