mod config;
mod runner;
mod telemetry;

use collector_domain::{EventStore, MetricsSink};
use collector_metrics::PrometheusMetricsSink;
use collector_nats::NatsClient;
use collector_postgres::{MigrationRunner, PostgresClient, PostgresConfig, PostgresEventStore};
use config::ServiceConfig;
use ingest_worker::{IngestWorker, IngestWorkerConfig};
use prometheus::Registry;
use runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use telemetry::init_telemetry;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_telemetry(&config.log_level);

    info!(
        subject = %config.events_subject,
        consumer = %config.consumer_name,
        "starting event-collector service"
    );
    debug!("configuration: {:?}", config);

    let postgres_config = PostgresConfig {
        host: config.postgres_host.clone(),
        port: config.postgres_port,
        database: config.postgres_database.clone(),
        username: config.postgres_username.clone(),
        password: config.postgres_password.clone(),
        max_pool_size: config.postgres_max_pool_size,
    };

    let store = match initialize_postgres(&config, &postgres_config).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = format!("{:#}", e), "failed to initialize PostgreSQL");
            std::process::exit(1);
        }
    };

    let nats_client = match initialize_nats(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = format!("{:#}", e), "failed to initialize NATS");
            std::process::exit(1);
        }
    };

    let registry = Registry::new();
    let metrics: Arc<dyn MetricsSink> = Arc::new(PrometheusMetricsSink::new(&registry));

    let worker = match IngestWorker::new(
        store,
        metrics,
        &nats_client,
        IngestWorkerConfig {
            stream: config.events_stream.clone(),
            subject: config.events_subject.clone(),
            durable_name: config.consumer_name.clone(),
            source: config.channel_source.clone(),
            nats_batch_size: config.nats_batch_size,
            nats_batch_wait_secs: config.nats_batch_wait_secs,
        },
    )
    .await
    {
        Ok(worker) => worker,
        Err(e) => {
            error!(error = format!("{:#}", e), "failed to initialize ingest worker");
            std::process::exit(1);
        }
    };

    let metrics_addr = config.metrics_addr();

    Runner::new()
        .with_named_process("ingest_worker", move |ctx| worker.run(ctx))
        .with_named_process("metrics_server", move |ctx| async move {
            collector_metrics::serve(&metrics_addr, registry, ctx).await
        })
        .with_closer(move || async move {
            info!("running cleanup tasks");
            nats_client.close().await;
            info!("cleanup complete");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10))
        .run()
        .await;
}

async fn initialize_postgres(
    config: &ServiceConfig,
    postgres_config: &PostgresConfig,
) -> anyhow::Result<Arc<dyn EventStore>> {
    info!("initializing PostgreSQL");

    let migration_runner = MigrationRunner::new(
        config.goose_binary_path.clone(),
        config.postgres_migrations_dir.clone(),
        postgres_config.dsn(),
    );
    migration_runner.run_migrations().await?;

    let client = PostgresClient::new(postgres_config)?;
    client.ping().await?;

    Ok(Arc::new(PostgresEventStore::new(client)))
}

async fn initialize_nats(config: &ServiceConfig) -> anyhow::Result<NatsClient> {
    info!("initializing NATS");

    let client = NatsClient::connect(
        &config.nats_url,
        Duration::from_secs(config.startup_timeout_secs),
    )
    .await?;
    client.ensure_stream(&config.events_stream).await?;

    Ok(client)
}
