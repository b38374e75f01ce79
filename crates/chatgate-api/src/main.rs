//! Chatgate CLI and HTTP gateway entry point.
//!
//! Binary name: `chatgate`
//!
//! Loads configuration, wires the moderation pipeline, session store and
//! inference backends, then serves the chat API until interrupted.

mod cli;
mod http;
mod state;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use chatgate_infra::config::load_config;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    chatgate_observe::init_tracing(cli.log_directive(), otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let mut config = load_config(&cli.config).await;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        Commands::Serve {
            host,
            port,
            backend_api_key,
            ..
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let state = AppState::init(config, backend_api_key.as_deref()).await?;

            let sweeper_cancel = CancellationToken::new();
            let sweeper = state.spawn_session_sweeper(sweeper_cancel.clone());

            let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(addr = %addr, "Chatgate listening");

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            sweeper_cancel.cancel();
            if let Err(e) = sweeper.await {
                tracing::warn!(error = %e, "Session sweeper task failed");
            }
            tracing::info!("Server stopped");
        }
    }

    chatgate_observe::shutdown_tracing();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
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
    tracing::info!("Shutdown signal received");
}
