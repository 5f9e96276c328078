//! Idempotent consumer process.
//!
//! Connects to PostgreSQL and Redis and applies migrations. Then, until
//! interrupted, consumes the inbound stream through the processing engine
//! and drains the transactional outbox into Redis streams.

use std::error::Error;
use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use idempotent_consumer::adapters::consumer::RedisStreamSource;
use idempotent_consumer::adapters::events::{stream_key, OutboxRelay, RedisStreamPublisher};
use idempotent_consumer::adapters::hooks::NoDelay;
use idempotent_consumer::adapters::metrics::RecorderMetrics;
use idempotent_consumer::adapters::postgres::{
    run_migrations, PostgresOutboxReader, PostgresTransactionManager,
};
use idempotent_consumer::config::{AppConfig, RedisConfig, TelemetryConfig};
use idempotent_consumer::ports::ProcessingMetrics;

type BoxError = Box<dyn Error + Send + Sync>;

async fn connect_redis(
    client: &redis::Client,
    config: &RedisConfig,
) -> Result<redis::aio::MultiplexedConnection, BoxError> {
    let conn =
        tokio::time::timeout(config.timeout(), client.get_multiplexed_tokio_connection()).await??;
    Ok(conn)
}

fn init_tracing(telemetry: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&telemetry.log_level));

    if telemetry.use_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.telemetry);

    tracing::info!(environment = ?config.telemetry.environment, "Starting idempotent consumer");

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let client = redis::Client::open(config.redis.url.as_str())?;
    let publisher = Arc::new(
        RedisStreamPublisher::new(connect_redis(&client, &config.redis).await?)
            .with_stream_prefix(config.redis.stream_prefix.clone()),
    );
    let metrics: Arc<dyn ProcessingMetrics> = Arc::new(RecorderMetrics::new());

    if !config.processing.consumer_enabled && !config.relay.enabled {
        tracing::warn!("Consumer and outbox relay both disabled; nothing to do");
        pool.close().await;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    if config.processing.consumer_enabled {
        let processing = &config.processing;
        let handler = Arc::new(processing.handler(
            Arc::new(PostgresTransactionManager::new(pool.clone())),
            publisher.clone(),
            Arc::new(NoDelay),
            metrics.clone(),
        ));
        let settings = handler.settings();
        tracing::info!(
            strategy = %processing.strategy,
            outbound_topic = %settings.outbound_topic,
            outbox_destination = %settings.outbox_destination,
            failure_policy = ?processing.failure_policy,
            "Processing engine configured"
        );

        // Blocking reads get their own connection.
        let source = RedisStreamSource::new(
            connect_redis(&client, &config.redis).await?,
            stream_key(&config.redis.stream_prefix, &processing.inbound_stream),
            processing.consumer_group.clone(),
            processing.consumer_name.clone(),
        )
        .with_block(processing.read_block());
        source.ensure_group().await?;

        let consumer = Arc::new(processing.consumer(handler, metrics.clone()));
        let consumer_loop = processing.consumer_loop(Arc::new(source), consumer);
        let shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { consumer_loop.run(shutdown).await }));
    } else {
        tracing::warn!("Inbound consumer disabled");
    }

    if config.relay.enabled {
        let relay = OutboxRelay::with_config(
            Arc::new(PostgresOutboxReader::new(pool.clone())),
            publisher.clone(),
            config.relay.relay_config(),
        )
        .with_metrics(metrics.clone());
        let shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { relay.run(shutdown).await }));
    } else {
        tracing::warn!("Outbox relay disabled");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    shutdown_tx.send(true)?;
    for task in tasks {
        task.await?;
    }

    pool.close().await;
    Ok(())
}
