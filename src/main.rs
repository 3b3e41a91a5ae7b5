use anyhow::{Context, Result};
use clap::Parser;
use ragchat::{api, chat::ChatService, config, logging};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Retrieval-augmented chat server backed by MongoDB Atlas vector search.
#[derive(Parser)]
#[command(name = "ragchat", version, about)]
struct Cli {
    /// Interface to bind (overrides `SERVER_HOST`).
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (overrides `SERVER_PORT`).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("failed to load configuration")?;
    logging::init_tracing();

    let service = Arc::new(
        ChatService::from_config(config)
            .await
            .context("failed to initialize chat pipeline")?,
    );
    let _sweeper = service
        .sessions()
        .spawn_sweeper(Duration::from_secs(config.session_sweep_interval_secs));
    let app = api::create_router(service);

    let host = cli.host.unwrap_or_else(|| config.server_host.clone());
    let port = cli.port.unwrap_or(config.server_port);
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated unexpectedly")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %error, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(error = %error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
