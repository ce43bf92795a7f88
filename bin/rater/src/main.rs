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

use anyhow::{Context, Result};
use clap::Parser;
use llm_providers::OpenAIClient;
use rater::grader::DEFAULT_GRADER_MODEL;
use rater::{Grader, Harness, HintGymApi};
use std::path::PathBuf;
use std::sync::Arc;
use wordpack::WordCatalog;

#[derive(Parser, Debug, Clone)]
#[command(name = "rater", about = "Runs hint episodes and grades them with an independent model")]
struct Cli {
    /// Number of episodes to run.
    #[arg(long, default_value_t = 10)]
    episodes: u32,

    #[arg(long, default_value = "http://localhost:3000")]
    api: String,

    /// Must be the same catalog the API serves.
    #[arg(long, default_value = "wordpacks/english.json")]
    wordpack: PathBuf,

    #[arg(long, default_value = DEFAULT_GRADER_MODEL)]
    grader_model: String,

    /// OpenAI-compatible chat completions URL.
    #[arg(long)]
    grader_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();
    let cli = Cli::parse();

    let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
    let catalog = WordCatalog::load(&cli.wordpack)
        .with_context(|| format!("loading word catalog {}", cli.wordpack.display()))?;
    let grader_client = OpenAIClient::new(api_key, cli.grader_endpoint, None, None)?;

    let harness = Harness::new(
        HintGymApi::new(cli.api),
        Grader::new(Arc::new(grader_client), cli.grader_model),
        Arc::new(catalog),
    );
    harness.run(cli.episodes).await;
    Ok(())
}
