//! Silo - a single-node, S3-wire-compatible object storage server.

use clap::Parser;
use silo_core::config::SiloConfig;
use silo_api::S3Server;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "silo")]
#[command(version = silo_core::VERSION)]
#[command(about = "S3-compatible object storage server", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Bind hostname
    #[arg(long, env = "SILO_BIND_ADDRESS", default_value = "127.0.0.1")]
    hostname: String,

    /// Port number
    #[arg(long, env = "SILO_PORT", default_value = "8080")]
    port: u16,

    /// Data directory for blobs and the metadata database
    #[arg(long, env = "SILO_DATA_DIR", default_value = "./data")]
    storage: String,

    /// Root access key (overrides AWS_ACCESS_KEY_ID)
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    access_key: Option<String>,

    /// Root secret key (overrides AWS_SECRET_ACCESS_KEY)
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY")]
    secret_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SILO_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Interval, in seconds, between lifecycle janitor sweeps
    #[arg(long, env = "SILO_LIFECYCLE_INTERVAL_SECS")]
    lifecycle_interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &cli.config {
        SiloConfig::from_file(config_path)?
    } else {
        SiloConfig::from_env()
    };

    // Override with CLI args; a data-dir change recomputes the default
    // database URL unless a config file already pinned one explicitly.
    config.server.bind_address = cli.hostname;
    config.server.port = cli.port;
    config.storage.data_dir = cli.storage.into();
    if cli.config.is_none() {
        config.database.url =
            silo_core::config::DatabaseConfig::default_url_for(&config.storage.data_dir);
    }
    if let Some(access_key) = cli.access_key {
        config.auth.root_access_key = access_key;
    }
    if let Some(secret_key) = cli.secret_key {
        config.auth.root_secret_key = secret_key;
    }
    if let Some(interval) = cli.lifecycle_interval_secs {
        config.lifecycle.scan_interval_secs = interval;
    }

    run_server(config).await?;

    Ok(())
}

async fn run_server(config: SiloConfig) -> anyhow::Result<()> {
    info!("Starting Silo server...");
    info!("Data directory: {:?}", config.storage.data_dir);
    info!("Database: {}", config.database.url);

    let server = S3Server::new(config);
    server.run().await?;

    Ok(())
}
