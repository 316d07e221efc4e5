//! quillkv server entry point.
//!
//! Sets up logging, binds the TCP listener and spawns one task per client.

use anyhow::Context;
use clap::Parser;
use quillkv::commands::CommandHandler;
use quillkv::config::Config;
use quillkv::connection::{handle_connection, ConnectionStats};
use quillkv::storage::StorageEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
quillkv v{} - In-Memory Key-Value Server
────────────────────────────────────────
Listening on {}
Use Ctrl+C to shutdown gracefully.
"#,
        quillkv::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    config.validate().context("invalid configuration")?;

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log filter '{}'", config.log_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let storage = Arc::new(StorageEngine::new());
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_address()))?;

    print_banner(&config);
    info!(address = %config.bind_address(), "Listening");

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&storage), Arc::clone(&stats), config.max_frame_size) => {}
        _ = shutdown => {}
    }

    let storage_stats = storage.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        protocol_errors = stats.protocol_errors.load(Ordering::Relaxed),
        keys = storage_stats.keys,
        hits = storage_stats.hits,
        misses = storage_stats.misses,
        expired = storage_stats.expired_count,
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
    max_frame_size: usize,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&storage));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats, max_frame_size).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
