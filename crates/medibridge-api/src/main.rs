//! MediBridge API Server
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use clap::Parser;
use medibridge_api::{create_router, state::AppState};
use medibridge_core::{AppConfig, PgStore, Stores};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// MediBridge clinical records API
#[derive(Parser, Debug)]
#[command(name = "medibridge-api", version, about)]
struct Args {
    /// TOML configuration file; environment variables override it
    #[arg(short, long, env = "MEDIBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Use the in-memory store even when DATABASE_URL is set
    #[arg(long)]
    in_memory: bool,
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "medibridge_api={level},medibridge_core={level},tower_http=info,audit=info",
            level = config.logging.level
        ))
    });

    if config.logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    init_tracing(&config);

    let stores = match config.database.postgres_url.as_deref() {
        Some(url) if !args.in_memory => {
            let store = PgStore::connect(url, config.database.max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            store
                .ensure_schema()
                .await
                .context("Failed to apply database schema")?;
            tracing::info!("Using PostgreSQL store");
            Stores::postgres(store)
        }
        _ => {
            tracing::warn!("Using in-memory store; data is lost on exit");
            Stores::in_memory()
        }
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, stores)?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("MediBridge API Server starting on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
