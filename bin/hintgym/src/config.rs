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

use config::{Config, ConfigError, Environment, File, Map};
use episodes::SurrealSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_BASENAME: &str = "config/hintgym";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http_addr: String,
    pub wordpack_path: PathBuf,
    /// Label stamped on every episode for the checkpoint that produced its hint.
    pub model_ckpt: String,
    pub body_limit_bytes: usize,
    pub hint_model: HintModelConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HintModelConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Surreal,
    Postgrest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub surreal: SurrealSettings,
    #[serde(default)]
    pub postgrest: Option<PostgrestConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgrestConfig {
    pub url: String,
    pub service_key: String,
}

/// Layers, lowest first: built-in defaults, the config file, `HINTGYM__*`
/// variables, then the legacy `SUPABASE_*` / `OLLAMA_BASE_URL` names.
///
/// With no explicit `path`, `config/hintgym.{toml,yaml,json}` is read if present.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with_env(path, std::env::vars().collect())
}

/// [`load_config`] against an explicit environment instead of the process's.
pub fn load_config_with_env(
    path: Option<&Path>,
    env: Map<String, String>,
) -> Result<AppConfig, ConfigError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_BASENAME).required(false),
    };

    let mut builder = Config::builder()
        .set_default("http_addr", "127.0.0.1:3000")?
        .set_default("wordpack_path", "wordpacks/english.json")?
        .set_default("model_ckpt", "base")?
        .set_default("body_limit_bytes", 64_i64 * 1024)?
        .set_default("hint_model.provider", "ollama")?
        .set_default("hint_model.base_url", "http://127.0.0.1:11434")?
        .set_default("hint_model.model", "mistral:latest")?
        .set_default("hint_model.temperature", 0.7_f64)?
        .set_default("hint_model.timeout_seconds", 60_i64)?
        .set_default("hint_model.max_retries", 0_i64)?
        .set_default("store.backend", "surreal")?
        .set_default("store.surreal.url", "mem://")?
        .set_default("store.surreal.namespace", "hintgym")?
        .set_default("store.surreal.database", "episodes")?
        .add_source(file)
        .add_source(
            Environment::with_prefix("HINTGYM")
                .separator("__")
                .source(Some(env.clone())),
        );

    if let (Some(url), Some(key)) = (env.get("SUPABASE_URL"), env.get("SUPABASE_SERVICE_ROLE_KEY")) {
        builder = builder
            .set_override("store.backend", "postgrest")?
            .set_override("store.postgrest.url", url.as_str())?
            .set_override("store.postgrest.service_key", key.as_str())?;
    }

    let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
    // Only meaningful for the ollama provider; an openai endpoint is left alone.
    if cfg.hint_model.provider.eq_ignore_ascii_case("ollama") {
        if let Some(url) = env.get("OLLAMA_BASE_URL") {
            cfg.hint_model.base_url = url.clone();
        }
    }
    Ok(cfg)
}
