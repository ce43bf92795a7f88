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

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use episodes::{HintOutcome, ScoreOutcome};
use serde::{Deserialize, Serialize};
use wordpack::TargetPick;

use super::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

// Fields are optional so that an absent field is reported by the service as
// a 400, like an empty one, instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct EpisodeRequest {
    #[serde(default)]
    pub word_id: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EpisodeCreated {
    pub episode_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HintRequest {
    #[serde(default)]
    pub episode_id: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AutoRewardRequest {
    #[serde(default)]
    pub episode_id: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub solved: Option<bool>,
    #[serde(default)]
    pub guess: Option<String>,
}

async fn next_target(State(state): State<AppState>) -> Json<TargetPick> {
    Json(state.service.pick_target())
}

async fn create_episode(
    State(state): State<AppState>,
    body: Result<Json<EpisodeRequest>, JsonRejection>,
) -> ApiResult<EpisodeCreated> {
    let Json(req) = body?;
    let episode_id = state
        .service
        .create_episode(
            req.word_id.as_deref().unwrap_or_default(),
            req.target.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(EpisodeCreated { episode_id }))
}

async fn generate_hint(
    State(state): State<AppState>,
    body: Result<Json<HintRequest>, JsonRejection>,
) -> ApiResult<HintOutcome> {
    let Json(req) = body?;
    let outcome = state
        .service
        .generate_hint(
            req.episode_id.as_deref().unwrap_or_default(),
            req.target.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(outcome))
}

async fn auto_reward(
    State(state): State<AppState>,
    body: Result<Json<AutoRewardRequest>, JsonRejection>,
) -> ApiResult<ScoreOutcome> {
    let Json(req) = body?;
    let outcome = state
        .service
        .score_episode(
            req.episode_id.as_deref().unwrap_or_default(),
            req.target.as_deref().unwrap_or_default(),
            req.solved.unwrap_or(false),
            req.guess,
        )
        .await?;
    Ok(Json(outcome))
}

pub fn build_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/api/next-target", get(next_target))
        .route("/api/episode", post(create_episode))
        .route("/api/hint", post(generate_hint))
        .route("/api/auto-reward", post(auto_reward))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
