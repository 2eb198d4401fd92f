//! herald entry point.
//!
//! Wires the ledger, directories, SMTP gateway, queue consumer, and deadline
//! sweeper together, then runs until interrupted.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use herald::config::Config;
use herald::consumer::{EventConsumer, EventQueue, MENTION_ALERT_QUEUE, STATUS_UPDATE_QUEUE};
use herald::delivery::SmtpGateway;
use herald::directory::{HttpTaskDirectory, HttpUserDirectory, TaskDirectory, UserDirectory};
use herald::ledger::{Ledger, PgLedger};
use herald::notify::Notifier;
use herald::sweep::DeadlineSweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with environment filter
    // Priority: RUST_LOG env var > --log-level CLI arg > default "info"
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)))
        .init();

    // Validate derived settings before touching the network
    let reference_tz = config.reference_tz()?;
    let sweep_schedule = config.sweep_schedule()?;

    info!(
        timezone = %reference_tz,
        sweep_cron = %config.sweep_cron,
        "starting herald"
    );

    let ledger = PgLedger::connect(&config.database_url).await?;
    ledger.run_migrations().await?;
    info!("dedup ledger ready");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;
    let users: Arc<dyn UserDirectory> =
        Arc::new(HttpUserDirectory::new(http.clone(), &config.user_service_url));
    let tasks: Arc<dyn TaskDirectory> =
        Arc::new(HttpTaskDirectory::new(http, &config.task_service_url));

    let gateway = Arc::new(SmtpGateway::new(&config.smtp())?);
    let ledger: Arc<dyn Ledger> = Arc::new(ledger);

    let notifier = Arc::new(Notifier::new(
        Arc::clone(&tasks),
        Arc::clone(&users),
        ledger,
        gateway,
        reference_tz,
    ));

    let status_queue = EventQueue::connect(
        &config.redis_url,
        STATUS_UPDATE_QUEUE,
        config.queue_connect_attempts,
        config.queue_connect_retry(),
    )
    .await?;
    let mention_queue =
        EventQueue::from_connection(status_queue.connection(), MENTION_ALERT_QUEUE);

    let mut consumer = EventConsumer::new(
        Arc::clone(&notifier),
        status_queue,
        mention_queue,
        config.queue_poll_interval(),
    );
    consumer.start().await?;

    let mut sweeper = DeadlineSweeper::new(sweep_schedule, reference_tz, tasks, notifier);
    sweeper.start()?;

    info!("herald running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    consumer.stop().await?;
    sweeper.stop().await?;

    info!("herald stopped");
    Ok(())
}
