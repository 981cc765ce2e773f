//! muddle-server - classroom confusion feedback service
//!
//! Students anonymously submit what confused them in class; teachers read
//! the raw entries and request an AI summary of the patterns.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use muddle_common::config::{self, DataFolderInitializer, DataFolderResolver, StorageKind};
use muddle_common::store::{init_store_database, JsonFileStore, KvStore, SqliteStore};
use muddle_server::services::gemini_client::{GeminiClient, DEFAULT_MODEL};
use muddle_server::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for muddle-server
#[derive(Parser, Debug)]
#[command(name = "muddle-server")]
#[command(about = "Classroom confusion feedback service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MUDDLE_PORT")]
    port: Option<u16>,

    /// Folder holding the persistent store
    #[arg(short, long)]
    data_folder: Option<PathBuf>,

    /// Storage backend: "sqlite" or "json"
    #[arg(short, long, env = "MUDDLE_STORAGE")]
    storage: Option<StorageKind>,

    /// Gemini model used for summaries
    #[arg(long)]
    gemini_model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification
    info!(
        "Starting muddle-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let file_config = config::load_toml_config().unwrap_or_default();

    // Resolve and create the data folder
    let data_folder = args
        .data_folder
        .clone()
        .unwrap_or_else(|| DataFolderResolver::new().resolve());
    let initializer = DataFolderInitializer::new(data_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize data folder")?;

    // Open the selected storage backend
    let storage = args.storage.or(file_config.storage).unwrap_or_default();
    let store: Arc<dyn KvStore> = match storage {
        StorageKind::Sqlite => {
            let db_path = initializer.database_path();
            info!("Store: sqlite at {}", db_path.display());
            let pool = init_store_database(&db_path)
                .await
                .context("Failed to open store database")?;
            Arc::new(SqliteStore::new(pool))
        }
        StorageKind::Json => {
            let file_path = initializer.store_file_path();
            info!("Store: json file at {}", file_path.display());
            let store = JsonFileStore::open(file_path)
                .await
                .context("Failed to open store file")?;
            Arc::new(store)
        }
    };

    // Gemini credential and model selection
    let api_key = config::gemini_api_key_from_env();
    if api_key.is_none() {
        warn!("No Gemini API key configured (GEMINI_API_KEY / GOOGLE_API_KEY); summarize requests will fail");
    }
    let model = args
        .gemini_model
        .or(file_config.gemini_model)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let client = GeminiClient::new(api_key, model);

    let state = AppState::new(store, client);
    let app = build_router(state);

    let port = args.port.or(file_config.port).unwrap_or(config::DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("muddle-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
