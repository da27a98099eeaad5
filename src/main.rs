//! EmberKV - An In-Memory Key-Value Server
//!
//! Entry point for the server binary: parses flags, sets up logging, binds
//! the TCP listener and spawns one task per client until Ctrl+C.

use emberkv::commands::CommandHandler;
use emberkv::config::{ConfigAction, ServerConfig};
use emberkv::connection::{handle_connection, ConnectionStats};
use emberkv::protocol::ProtocolLimits;
use emberkv::storage::StorageEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
EmberKV - An In-Memory Key-Value Server

USAGE:
    emberkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Host to bind to (default: localhost)
    -p, --port <PORT>          Port to listen on (default: 6379)
        --max-depth <N>        Max array nesting depth (default: 32)
        --max-elements <N>     Max elements in one array (default: 1048576)
        --max-bulk <BYTES>     Max bulk string length (default: 536870912)
        --max-line <BYTES>     Max simple string or header line (default: 65536)
    -v, --version              Print version information
        --help                 Print this help message

ENVIRONMENT:
    RUST_LOG                   Log filter (default: info)

EXAMPLES:
    emberkv                        # Start on localhost:6379
    emberkv --port 6380            # Start on port 6380
    emberkv --host 0.0.0.0         # Listen on all interfaces

CONNECTING:
    $ emberkv-cli -p 6379
    > SET color blue
    OK
    > GET color
    "blue"
"#
    );
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
  ┌──────────────────────────────────────────────┐
  │  EmberKV v{:<35}│
  │  In-Memory Key-Value Server                  │
  └──────────────────────────────────────────────┘
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        emberkv::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match ServerConfig::from_args(std::env::args().skip(1)) {
        Ok(ConfigAction::Run(config)) => config,
        Ok(ConfigAction::Help) => {
            print_help();
            return Ok(());
        }
        Ok(ConfigAction::Version) => {
            println!("EmberKV version {}", emberkv::VERSION);
            return Ok(());
        }
        Err(e) => {
            print_help();
            return Err(e.into());
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    print_banner(&config);

    // Shared across all connections
    let storage = Arc::new(StorageEngine::new());
    info!("Storage engine initialized with 64 shards");

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(
        address = %config.bind_address(),
        max_depth = config.limits.max_depth,
        max_elements = config.limits.max_array_elements,
        max_bulk = config.limits.max_bulk_len,
        max_line = config.limits.max_line_len,
        "Listening"
    );

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&storage), Arc::clone(&stats), config.limits) => {}
        _ = shutdown => {}
    }

    let storage_stats = storage.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        active = stats.active_connections.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        bytes_read = stats.bytes_read.load(Ordering::Relaxed),
        bytes_written = stats.bytes_written.load(Ordering::Relaxed),
        keys = storage_stats.keys,
        expired = storage_stats.expired,
        "Final statistics"
    );
    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
    limits: ProtocolLimits,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&storage));
                let stats = Arc::clone(&stats);

                tokio::spawn(handle_connection(stream, addr, handler, limits, stats));
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
