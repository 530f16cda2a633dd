//! Startup module - orchestrates application initialization.
//!
//! Order matters: configuration and logging first, then the metrics
//! listener, the database pool, NATS and stream provisioning, and only then
//! the command subscriber. Any failure before the subscriber starts aborts
//! the process.

pub mod shutdown;

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use todo_processor_domain::command::TodoCommandProcessor;
use todo_processor_infrastructure::messaging::{
    self, CommandSubscriber, CommandSubscriberConfig, NatsEventPublisher, initialize_nats_streams,
};
use todo_processor_infrastructure::observability::{
    ProcessorMetrics, TracingConfig, init_tracing, serve_metrics,
};
use todo_processor_infrastructure::persistence::{DatabasePool, DatabasePoolConfig, PgExecutor};
use todoflow_shared::config::{ConfigLoader, ConfigOverrides, DatabaseConfig, ProcessorConfigDto};
use tracing::{info, warn};

use shutdown::{GracefulShutdown, ShutdownConfig, start_signal_handler};

/// Service name used in logs
pub const SERVICE_NAME: &str = "domain-processor";

/// Load and validate configuration from `.env`, environment and flags.
pub fn load_config(
    env_file: Option<PathBuf>,
    overrides: ConfigOverrides,
) -> anyhow::Result<ProcessorConfigDto> {
    ConfigLoader::new(env_file)
        .with_overrides(overrides)
        .load_processor_config()
        .context("Invalid configuration")
}

/// Run the processor until SIGINT or SIGTERM.
pub async fn run(config: ProcessorConfigDto) -> anyhow::Result<()> {
    let tracing_result = init_tracing(&TracingConfig {
        service_name: SERVICE_NAME.to_string(),
        log_level: config.logging.level.clone(),
    });
    for error in &tracing_result.errors {
        warn!(error = %error, "Tracing setup problem");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        nats = ?config.nats.urls,
        metrics_addr = %config.metrics.listen_addr,
        "{} starting",
        SERVICE_NAME
    );

    let shutdown = GracefulShutdown::new(ShutdownConfig::default());
    start_signal_handler(&shutdown);

    // Step 1: Metrics
    let metrics = Arc::new(ProcessorMetrics::new().context("Failed to register metrics")?);
    let metrics_task = serve_metrics(
        config.metrics.listen_addr,
        metrics.registry(),
        shutdown.subscribe(),
    )
    .await?;

    // Step 2: Database
    let pool = connect_to_database(&config.database).await?;
    info!("✓ Database connected");

    // Step 3: NATS and streams
    let nats = messaging::connect(&config.nats)
        .await
        .context("Failed to connect to NATS")?;
    let jetstream = async_nats::jetstream::new(nats.clone());
    initialize_nats_streams(&jetstream).await?;
    info!("✓ NATS streams ready");

    // Step 4: Processor and subscriber
    let publisher = NatsEventPublisher::new(jetstream.clone()).with_metrics(Arc::clone(&metrics));
    let processor = TodoCommandProcessor::new(
        Arc::new(PgExecutor::new(pool.pg_pool())),
        Arc::new(publisher),
    );
    let subscriber_task = CommandSubscriber::new(
        jetstream,
        Arc::new(processor),
        metrics,
        CommandSubscriberConfig::from(&config.nats),
    )
    .start(shutdown.subscribe())
    .await
    .context("Failed to start command subscriber")?;

    info!("{} is running", SERVICE_NAME);

    let reason = shutdown.wait_for_signal().await;
    info!(reason = %reason, "Shutting down gracefully...");

    shutdown
        .drain(vec![
            ("command-subscriber", subscriber_task),
            ("metrics-server", metrics_task),
        ])
        .await;

    if let Err(e) = nats.flush().await {
        warn!(error = %e, "Failed to flush NATS connection");
    }
    pool.close().await;

    info!("{} stopped", SERVICE_NAME);
    Ok(())
}

/// Connect to database.
async fn connect_to_database(config: &DatabaseConfig) -> anyhow::Result<DatabasePool> {
    info!(pool_size = config.pool_size, "Connecting to database...");

    DatabasePool::new(&config.url, DatabasePoolConfig::from(config))
        .await
        .context("Failed to connect to database")
}
