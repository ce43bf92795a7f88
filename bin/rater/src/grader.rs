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

use llm_contracts::{LLMResult, ProviderRequest};
use llm_providers::ApiClient;
use std::sync::Arc;
use wordpack::normalise;

pub const DEFAULT_GRADER_MODEL: &str = "gpt-4o-mini";
const GRADER_TEMPERATURE: f32 = 0.3;
const SYSTEM_PROMPT: &str = "Given a hint, answer with exactly one lowercase English word.";

/// Reduces a free-form model reply to a single comparable word: quotes and
/// backticks removed, first whitespace token, normalised. May be empty.
pub fn parse_guess(reply: &str) -> String {
    let cleaned: String = reply
        .trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`'))
        .collect();
    cleaned
        .split_whitespace()
        .next()
        .map(normalise)
        .unwrap_or_default()
}

/// The independent guesser: sees only the hint, never the target.
pub struct Grader {
    client: Arc<dyn ApiClient>,
    model: String,
}

impl Grader {
    pub fn new(client: Arc<dyn ApiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn request_for(&self, hint: &str) -> ProviderRequest {
        ProviderRequest::chat(
            self.model.clone(),
            SYSTEM_PROMPT,
            format!("Hint:\n{hint}\n\nAnswer with one word only:"),
        )
        .with_temperature(GRADER_TEMPERATURE)
        .with_top_p(1.0)
    }

    pub async fn guess(&self, hint: &str) -> LLMResult<String> {
        let response = self.client.send_request(self.request_for(hint)).await?;
        Ok(parse_guess(&response.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_word_only() {
        assert_eq!(parse_guess("Cat is my answer"), "cat");
        assert_eq!(parse_guess("  river\n"), "river");
    }

    #[test]
    fn strips_quotes_and_backticks() {
        assert_eq!(parse_guess("\"Cat\""), "cat");
        assert_eq!(parse_guess("`kitty` probably"), "kitty");
        assert_eq!(parse_guess("'feline'"), "feline");
    }

    #[test]
    fn folds_diacritics() {
        assert_eq!(parse_guess("Café"), "cafe");
    }

    #[test]
    fn empty_reply_gives_empty_guess() {
        assert_eq!(parse_guess(""), "");
        assert_eq!(parse_guess("``"), "");
    }
}
