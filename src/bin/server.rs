use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meteo_backend::config::ServerConfig;
use meteo_backend::db;
use meteo_backend::web::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging() {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` with chatty sqlx statement logging demoted, unless
    // RUST_LOG overrides.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    init_logging();

    // --- Server Config Setup (loads .env) ---
    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load server configuration: {}", e);
            return Err(e.into());
        }
    };

    // --- Database Pool Setup ---
    let pool = db::connect_pool(&config.database_url, config.max_connections).await?;

    // --- Schema Provisioning (idempotent) ---
    db::schema::init(&pool).await?;
    info!("Database schema is ready");

    // --- HTTP Server ---
    let app_state = Arc::new(AppState {
        pool,
        config: config.clone(),
    });
    let router = web::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("JSON API server listening on {}", config.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
