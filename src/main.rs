//! linecmd: a line-oriented TCP command dispatcher
//!
//! A server reads newline-terminated command names and hands the rest of the
//! stream to the handler registered for each one:
//! - `STRING`: one text line, acknowledged with a fixed reply
//! - `GOB`: one binary-encoded structured record, no reply
//!
//! Run without `--connect` to listen; with `--connect <host>` to act as the
//! demonstration client.

mod client;
mod commands;
mod config;
mod events;
mod record;
mod registry;
mod server;

use std::sync::Arc;

use config::{Config, Mode};
use events::TracingSink;
use server::Endpoint;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    match config.mode {
        Mode::Client { peer } => {
            if let Err(e) = client::run(&peer).await {
                error!(error = %e, "Client failed");
            }
            info!("Client done.");
        }
        Mode::Server { listen } => {
            if let Err(e) = run_server(&listen).await {
                error!(error = %e, "Server failed");
            }
            info!("Server done.");
        }
    }

    Ok(())
}

/// Listen until the endpoint fails to bind or the process is interrupted.
async fn run_server(listen: &str) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = Endpoint::bind(listen, Arc::new(TracingSink)).await?;
    let registry = endpoint.registry();
    commands::register_builtin(&registry);
    info!(count = registry.len(), commands = ?registry.commands(), "Commands registered");

    tokio::select! {
        _ = endpoint.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, no longer accepting connections");
        }
    }

    Ok(())
}
