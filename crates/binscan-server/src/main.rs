//! # binscan-server
//!
//! HTTP server for binscan.
//!
//! This binary provides:
//! - REST API for bin search, geofence checks, QR scans, and history
//! - OpenAPI documentation via Swagger UI
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package binscan-server
//!
//! # Production
//! BINSCAN_ENV=production ./binscan-server
//! ```
//!
//! The configuration file is read from `BINSCAN_CONFIG` when set, otherwise
//! from the platform default path. Any value can be overridden with
//! `BINSCAN__SECTION__KEY` environment variables.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use binscan_core::{default_config_path, Config};
use binscan_server::state::AppState;
use binscan_server::{api, logging};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = logging::init(logging::LogMode::from_env())?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting binscan-server");

    let config_path = std::env::var_os("BINSCAN_CONFIG")
        .map(PathBuf::from)
        .or_else(default_config_path);
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host or server.port")?;

    let state = AppState::from_config(config)
        .context("Failed to initialize application state")?
        .into_shared();
    let app = api::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
