//! Todo Domain Processor
//!
//! Main entry point: consumes todo commands, applies them to PostgreSQL and
//! publishes the resulting events.

mod startup;

use clap::Parser;
use std::path::PathBuf;
use todoflow_shared::config::ConfigOverrides;

/// CLI arguments for todo-processor
///
/// Every flag overrides the environment variable of the same purpose.
#[derive(clap::Parser, Debug)]
#[command(name = "todo-processor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Todo command processor for NATS JetStream and PostgreSQL", long_about = None)]
struct Args {
    /// NATS server URL(s), comma-separated [env: NATS_URL]
    #[arg(long)]
    nats_url: Option<String>,

    /// PostgreSQL connection string [env: DATABASE_URL]
    #[arg(long)]
    db_url: Option<String>,

    /// Log level or filter directive [env: LOG_LEVEL]
    #[arg(long)]
    log_level: Option<String>,

    /// Prometheus listen address, e.g. ":9091" [env: METRICS_ADDR]
    #[arg(long)]
    metrics_addr: Option<String>,

    /// Optional .env file loaded before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            nats_url: self.nats_url.clone(),
            database_url: self.db_url.clone(),
            log_level: self.log_level.clone(),
            metrics_addr: self.metrics_addr.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = startup::load_config(args.env_file.clone(), args.overrides())?;

    startup::run(config).await
}
