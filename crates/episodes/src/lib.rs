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

//! Episode lifecycle for hint-giving training data: target selection, hint
//! generation with leak checks, and reward scoring.

pub mod hint;
pub mod model;
pub mod reward;
pub mod service;
pub mod store;

pub use hint::HintGenerator;
pub use model::{
    Episode, Feedback, HintOutcome, HintRecord, NewEpisode, NewFeedback, RewardTag, ScoreOutcome,
};
pub use reward::{brevity, score, Reward, SOLVE_BONUS};
pub use service::{EpisodeError, EpisodeService};
pub use store::{
    EpisodeStore, HintWrite, PostgrestEpisodeStore, StoreError, SurrealEpisodeStore,
    SurrealSettings,
};
