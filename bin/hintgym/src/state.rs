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

use anyhow::{bail, Context, Result};
use episodes::{
    EpisodeService, EpisodeStore, HintGenerator, PostgrestEpisodeStore, SurrealEpisodeStore,
};
use llm_contracts::Provider;
use llm_providers::{ApiClient, OllamaClient, OpenAIClient};
use std::sync::Arc;
use tracing::{info, warn};
use wordpack::WordCatalog;

use crate::config::{AppConfig, HintModelConfig, StoreBackend};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EpisodeService>,
}

impl AppState {
    pub fn new(service: EpisodeService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn EpisodeStore>> {
    let store: Arc<dyn EpisodeStore> = match cfg.store.backend {
        StoreBackend::Surreal => Arc::new(
            SurrealEpisodeStore::connect(&cfg.store.surreal)
                .await
                .context("connecting surreal episode store")?,
        ),
        StoreBackend::Postgrest => {
            let Some(pg) = &cfg.store.postgrest else {
                bail!("store.backend is postgrest but store.postgrest is not configured");
            };
            Arc::new(PostgrestEpisodeStore::new(&pg.url, &pg.service_key)?)
        }
    };
    info!(backend = store.backend_name(), "episode store selected");
    Ok(store)
}

async fn build_hint_client(cfg: &HintModelConfig) -> Result<Arc<dyn ApiClient>> {
    let client: Arc<dyn ApiClient> = match Provider::from(cfg.provider.to_lowercase()) {
        Provider::Ollama => {
            let client = OllamaClient::new(
                Some(cfg.base_url.clone()),
                Some(cfg.timeout_seconds),
                Some(cfg.max_retries),
            )?;
            if let Err(e) = client.health_check().await {
                warn!(error = %e, base_url = %cfg.base_url, "hint model not reachable yet, continuing");
            }
            Arc::new(client)
        }
        Provider::OpenAI => {
            let Some(api_key) = cfg.api_key.clone() else {
                bail!("hint_model.api_key is required for the openai provider");
            };
            Arc::new(OpenAIClient::new(
                api_key,
                Some(cfg.base_url.clone()),
                Some(cfg.timeout_seconds),
                Some(cfg.max_retries),
            )?)
        }
        Provider::Custom(other) => bail!("unsupported hint model provider '{other}'"),
    };
    Ok(client)
}

/// Loads the catalog and wires store, hint model and service. Any failure
/// here is fatal for the process.
pub async fn build_state(cfg: &AppConfig) -> Result<AppState> {
    let catalog = WordCatalog::load(&cfg.wordpack_path)
        .with_context(|| format!("loading word catalog {}", cfg.wordpack_path.display()))?;
    let store = build_store(cfg).await?;
    let client = build_hint_client(&cfg.hint_model).await?;
    let generator = HintGenerator::new(client, cfg.hint_model.model.clone())
        .with_temperature(cfg.hint_model.temperature);

    info!(
        words = catalog.len(),
        model = %cfg.hint_model.model,
        model_ckpt = %cfg.model_ckpt,
        "episode service ready"
    );
    Ok(AppState::new(EpisodeService::new(
        Arc::new(catalog),
        store,
        generator,
        cfg.model_ckpt.clone(),
    )))
}
