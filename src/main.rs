use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stats_processor::api::{build_router, cors_layer, state::AppState};
use stats_processor::config::AppConfig;
use stats_processor::service::{StatsService, WriteMode};
use stats_processor::storage::{self, CacheWriter};

#[derive(Parser)]
#[command(name = "stats-processor")]
#[command(about = "Aggregates player match histories into cached stats")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one batch from a JSON file and print the response
    Compute {
        /// Request body file (`{"players": [...]}`)
        #[arg(long)]
        input: PathBuf,

        /// Skip writing results to the cache store
        #[arg(long)]
        no_cache: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `compute` output stays clean JSON.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!("Starting stats-processor v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    match cli.command {
        Commands::Serve { host, port } => {
            let service = build_service(&config, true).await?;
            let cors = cors_layer(&config.server.cors_origin)?;
            let app = build_router(AppState::new(service)).layer(cors);

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            tracing::info!("Stats processor listening on http://{}", addr);
            tracing::info!("Endpoints: POST /compute-stats, GET /health");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Compute { input, no_cache } => {
            let body = std::fs::read(&input)
                .with_context(|| format!("Failed to read {:?}", input))?;

            // One-shot run: always wait for the cache write before exiting.
            let service = build_service(&config, !no_cache)
                .await?
                .with_write_mode(WriteMode::Inline);
            let response = service.compute_from_slice(&body).await;

            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.success {
                anyhow::bail!("{}", response.message);
            }
        }
    }

    Ok(())
}

/// Wire the stats service to the configured cache store.
async fn build_service(config: &AppConfig, with_cache: bool) -> Result<StatsService> {
    if !with_cache {
        tracing::info!("Cache disabled; results will not be stored");
        return Ok(StatsService::without_cache(config.stats));
    }

    let cache = &config.cache;
    let store = storage::connect(cache, cache.connect_timeout()?)
        .await
        .with_context(|| format!("Failed to open {} cache store", cache.backend))?;
    let writer = CacheWriter::new(store, cache.ttl()?, cache.write_deadline()?);

    let mode = if cache.background {
        WriteMode::Background
    } else {
        WriteMode::Inline
    };

    Ok(StatsService::new(config.stats, writer).with_write_mode(mode))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
