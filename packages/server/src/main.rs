use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use snapmap_server::config::AppConfig;
use snapmap_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::load().context("Failed to load config")?;
    info!(
        upload_dir = %config.storage.upload_dir.display(),
        ledger_path = %config.storage.ledger_path.display(),
        max_file_size = config.upload.max_file_size,
        max_files = config.upload.max_files,
        "Configuration loaded"
    );

    let state = AppState::init(config.clone())
        .await
        .context("Failed to open storage")?;
    let ledger = state.ledger.clone();

    let app = snapmap_server::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Backend listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ledger
        .flush()
        .await
        .context("Failed to flush metadata ledger")?;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
