mod api;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use smartvision_config::{ensure_valid, redacted_summary, validate, Config, LogFormat};
use smartvision_core::{BlobStore, VisionService};
use smartvision_logging::{init_logger, redact_sensitive_data, LogSettings};
use smartvision_media::{AzureBlobStore, ImageUploader};
use smartvision_understanding::{AzureVisionClient, ImageAnalyzer, ReadPoller};

use api::{AppState, ComponentStatus, Readiness, RouterOptions};

#[derive(Parser)]
#[command(name = "smartvision")]
#[command(about = "SmartVision: image captioning, tagging and OCR backed by Azure")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ping a running server
    Status {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Validate the environment configuration and print it with secrets masked
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    init_logger(&LogSettings {
        level: &config.log_level,
        json: config.log_format == LogFormat::Json,
        dir: config.log_dir.as_deref().map(Path::new),
    });

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Status { port } => {
            let port = port.unwrap_or(config.port);
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/api/test", port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("SmartVision is not running on port {}", port);
                }
            }
        }
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&redacted_summary(&config))?);
            let report = validate(&config);
            for warning in &report.warnings {
                println!("warning: {}: {}", warning.var, warning.message);
            }
            for error in &report.errors {
                println!("error: {}: {}", error.var, error.message);
            }
            if !report.is_valid() {
                anyhow::bail!("invalid configuration: {}", report.summary());
            }
            println!("Configuration OK");
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    ensure_valid(&config)?;
    info!(config = %redacted_summary(&config), "Starting SmartVision server");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    let endpoint = config
        .vision_endpoint
        .as_deref()
        .context("COMPUTER_VISION_ENDPOINT is not set")?;
    let key = config
        .vision_key
        .as_deref()
        .context("COMPUTER_VISION_KEY is not set")?;
    let vision: Arc<dyn VisionService> =
        Arc::new(AzureVisionClient::new(endpoint, key).with_client(http.clone()));
    info!(endpoint = %endpoint, "Computer Vision client initialized");

    let connection_string = config
        .blob_connection_string
        .as_deref()
        .context("BLOB_CONNECTION_STRING is not set")?;
    let container = config
        .blob_container
        .as_deref()
        .context("BLOB_CONTAINER_NAME is not set")?;
    let store = AzureBlobStore::from_connection_string(connection_string, container)
        .map_err(|e| anyhow::anyhow!(redact_sensitive_data(&e.to_string())))?
        .with_client(http);
    info!(account = %store.account_name(), container = %container, "Blob storage client initialized");
    let store: Arc<dyn BlobStore> = Arc::new(store);

    let storage = match store.ensure_container().await {
        Ok(()) => {
            info!(container = %container, "Blob container ready");
            ComponentStatus::Ready
        }
        Err(e) => {
            error!(
                error = %redact_sensitive_data(&e.to_string()),
                "Could not prepare blob container; uploads may fail"
            );
            ComponentStatus::Degraded
        }
    };

    let analyzer = ImageAnalyzer::new(vision)
        .with_poller(ReadPoller::new(
            config.ocr_max_attempts,
            Duration::from_millis(config.ocr_poll_interval_ms),
        ))
        .with_language(config.ocr_language.clone());
    let uploader = ImageUploader::new(store);

    let app_state = Arc::new(AppState::new(analyzer, uploader).with_readiness(Readiness {
        vision: ComponentStatus::Ready,
        storage,
    }));

    let static_dir = PathBuf::from(&config.static_dir);
    if !static_dir.is_dir() {
        warn!(dir = %static_dir.display(), "Static directory not found; only /api routes will respond");
    }
    let options = RouterOptions {
        static_dir,
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = api::build_router(app_state, &options)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());
    let addr = config.listen_addr();

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(addr = %addr, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
