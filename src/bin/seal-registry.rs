//! # Seal-Registry Server
//!
//! Loads configuration and serves the registry HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! # In-memory registry on 127.0.0.1:5000
//! cargo run --bin seal-registry
//!
//! # Persist keys and history, listen on all interfaces
//! cargo run --bin seal-registry -- --data-file ./data/registry.json --host 0.0.0.0
//!
//! # Configuration file plus verbose output
//! cargo run --bin seal-registry -- --config registry.json -v
//! ```

use anyhow::Context;
use clap::Parser;
use seal_registry::common::config::RegistryConfig;
use seal_registry::server;
use seal_registry::service::CryptoService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "seal-registry",
    about = "Key and operation registry server",
    long_about = "Serve RSA key management, signing, encryption and hashing over HTTP/JSON, \
                  with per-key usage accounting and an audited operation log"
)]
struct ServerArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address override
    #[arg(long)]
    host: Option<String>,

    /// Listen port override
    #[arg(long)]
    port: Option<u16>,

    /// Registry snapshot file; keys and history stay in memory when absent
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config =
        RegistryConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(data_file) = args.data_file {
        config.storage.data_file = Some(data_file);
    }

    let service = CryptoService::from_config(&config).context("failed to open registry")?;
    info!(
        durable = service.is_durable(),
        data_file = ?config.storage.data_file,
        "registry opened"
    );

    server::serve(&config.server, Arc::new(service))
        .await
        .context("server terminated")?;
    Ok(())
}
