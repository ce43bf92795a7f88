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

use llm_contracts::{LLMError, LLMResult, ProviderRequest};
use llm_providers::ApiClient;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Asks the hint model for one short description of a target. Each call is a
/// fresh single-turn exchange; nothing is remembered between calls.
#[derive(Clone)]
pub struct HintGenerator {
    client: Arc<dyn ApiClient>,
    model: String,
    temperature: f32,
}

impl HintGenerator {
    pub fn new(client: Arc<dyn ApiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn request_for(&self, target: &str) -> ProviderRequest {
        ProviderRequest::chat(
            self.model.clone(),
            format!("Describe \"{target}\", without using the word \"{target}\""),
            format!("Target: {target}\nWrite one short hint."),
        )
        .with_temperature(self.temperature)
    }

    pub async fn generate(&self, target: &str) -> LLMResult<String> {
        let response = self.client.send_request(self.request_for(target)).await?;
        let hint = response.content.trim();
        if hint.is_empty() {
            return Err(LLMError::Provider(format!(
                "{} returned an empty hint",
                self.client.provider_name()
            )));
        }
        debug!(provider = self.client.provider_name(), model = %self.model, "hint generated");
        Ok(hint.to_string())
    }
}
