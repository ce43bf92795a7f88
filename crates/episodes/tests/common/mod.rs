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
use episodes::{EpisodeService, HintGenerator, SurrealEpisodeStore};
use llm_contracts::{LLMError, LLMResult, ProviderRequest, ProviderResponse, Usage};
use llm_providers::ApiClient;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use wordpack::WordCatalog;

pub const PACK: &str = r#"[
    { "id": "en-0001", "target": "cat", "aliases": ["kitty", "feline"] },
    { "id": "en-0002", "target": "café" },
    { "id": "en-0003", "target": "river", "aliases": [] }
]"#;

/// Replays canned hint-model replies in order; `Err` entries become provider errors.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Result<S, S>>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(Into::into).map_err(Into::into))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClient for ScriptedModel {
    async fn send_request(&self, request: ProviderRequest) -> LLMResult<ProviderResponse> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("script exhausted".to_string()));
        match reply {
            Ok(content) => Ok(ProviderResponse {
                content,
                model,
                usage: Usage::default(),
                finish_reason: Some("stop".into()),
                raw_response: serde_json::Value::Null,
            }),
            Err(message) => Err(LLMError::Provider(message)),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn health_check(&self) -> LLMResult<()> {
        Ok(())
    }
}

pub async fn service_with(model: Arc<ScriptedModel>) -> (EpisodeService, Arc<SurrealEpisodeStore>) {
    let catalog = Arc::new(WordCatalog::from_json_str(PACK).unwrap());
    let store = Arc::new(SurrealEpisodeStore::in_memory().await.expect("mem store"));
    let service = EpisodeService::new(
        catalog,
        store.clone(),
        HintGenerator::new(model, "mistral:latest"),
        "base",
    );
    (service, store)
}
