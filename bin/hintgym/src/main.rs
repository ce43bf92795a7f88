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

// Minimal bootstrap; handlers and wiring live in the library.
use anyhow::{Context, Result};
use clap::Parser;
use hintgym::{build_state, config::load_config, http::build_router};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug, Clone)]
#[command(name = "hintgym", about = "Hint episode collection API")]
struct Cli {
    /// Config file; defaults to config/hintgym.* when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();
    let cli = Cli::parse();

    let cfg = load_config(cli.config.as_deref()).context("loading configuration")?;
    let state = build_state(&cfg).await?;
    let app = build_router(state, cfg.body_limit_bytes);

    let addr: SocketAddr = cfg
        .http_addr
        .parse()
        .with_context(|| format!("invalid http_addr '{}'", cfg.http_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(local = %listener.local_addr()?, "api listening");

    tokio::select! {
        res = axum::serve(listener, app) => res.context("http server")?,
        _ = tokio::signal::ctrl_c() => {}
    }
    info!("hintgym shutting down");
    Ok(())
}
