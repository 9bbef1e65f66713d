//! Threat intelligence lookup CLI.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use threatscope::{Config, QueryService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "threatscope")]
#[command(about = "Aggregate IP threat intelligence from multiple providers into a single risk verdict")]
#[command(version)]
struct Args {
    /// IP address to look up
    #[arg(value_name = "IP")]
    ip: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "threatscope.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --print-config
    if args.print_config {
        println!("{}", Config::example());
        return Ok(());
    }

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    info!(config = %args.config.display(), "Loading configuration");
    let config = Config::load(&args.config)?;

    // Handle --validate
    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    let service = QueryService::from_config(&config);

    // A missing IP surfaces as the service's own client-input error
    let ip = args.ip.unwrap_or_default();
    let result = service.handle(&ip).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
