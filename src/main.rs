use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info};

use home_users_api::{
    config::{Config, StorageBackend},
    create_router,
    middleware::init_tracing,
    Database, InMemoryUserRepository, SharedUserRepository,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => {
            info!(
                production = config.environment.is_production(),
                "Configuration loaded successfully"
            );
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let repo = match build_repository(config.storage).await {
        Ok(repo) => repo,
        Err(e) => {
            error!("Failed to initialize user storage: {}", e);
            std::process::exit(1);
        }
    };

    let app = create_router(repo, config.request_timeout);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Connects, probes and migrates Postgres, or hands out a fresh in-memory store
async fn build_repository(storage: StorageBackend) -> home_users_api::ApiResult<SharedUserRepository> {
    match storage {
        StorageBackend::Postgres(database_config) => {
            let database = Database::new(database_config).await?;
            info!("Database connection established");

            database.migrate().await?;
            let repo: SharedUserRepository = Arc::new(database);
            Ok(repo)
        }
        StorageBackend::Memory => {
            info!("Using in-memory user storage, data is lost on shutdown");
            let repo: SharedUserRepository = Arc::new(InMemoryUserRepository::new());
            Ok(repo)
        }
    }
}

/// Graceful shutdown signal handler
/// Listens for SIGTERM and SIGINT signals
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        },
    }
}
