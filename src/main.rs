//! Membership Server
//!
//! Document verification, member registration and membership card rendering.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use membership_server::config::Config;
use membership_server::state::AppState;
use membership_server::{db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "membership_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Membership Server v{}", env!("CARGO_PKG_VERSION"));

    for dir in config.paths.all_dirs() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    if !config.paths.template_path().is_file() {
        tracing::warn!(
            path = %config.paths.template_path().display(),
            "Card template missing; card generation will fail until it is provided"
        );
    }

    // Initialize database
    let db_pool = db::create_pool(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database initialized at {}", config.database.url);

    let app_state = AppState::new(config.clone(), db_pool);
    app_state.verification().clone().start_cleanup_task();

    let app = routes::router(app_state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    tracing::info!("Membership Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
