use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// JetStream stream holding inbound events
    #[serde(default = "default_events_stream")]
    pub events_stream: String,

    /// Subject this collector subscribes to
    #[serde(default = "default_events_subject")]
    pub events_subject: String,

    /// Durable consumer name; instances sharing it split the stream
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// Channel identity used as the failure-metrics source label
    #[serde(default = "default_channel_source")]
    pub channel_source: String,

    /// Batch size for the pull consumer
    #[serde(default = "default_nats_batch_size")]
    pub nats_batch_size: usize,

    /// Max wait time for batches in seconds
    #[serde(default = "default_nats_batch_wait_secs")]
    pub nats_batch_wait_secs: u64,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // PostgreSQL configuration
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    /// Directory of goose-annotated SQL migration files
    #[serde(default = "default_postgres_migrations_dir")]
    pub postgres_migrations_dir: String,

    /// Path to the goose binary used to apply migrations
    #[serde(default = "default_goose_binary_path")]
    pub goose_binary_path: String,

    // Metrics exposition
    #[serde(default = "default_metrics_host")]
    pub metrics_host: String,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}

// NATS defaults
fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_events_stream() -> String {
    "events".to_string()
}

fn default_events_subject() -> String {
    "events.facebook".to_string()
}

fn default_consumer_name() -> String {
    "fb-collector-facebook".to_string()
}

fn default_channel_source() -> String {
    "facebook".to_string()
}

fn default_nats_batch_size() -> usize {
    10
}

fn default_nats_batch_wait_secs() -> u64 {
    5
}

fn default_startup_timeout_secs() -> u64 {
    30
}

// PostgreSQL defaults
fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "collector".to_string()
}

fn default_postgres_username() -> String {
    "collector".to_string()
}

fn default_postgres_password() -> String {
    "collector".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    10
}

fn default_postgres_migrations_dir() -> String {
    "crates/collector-postgres/migrations".to_string()
}

fn default_goose_binary_path() -> String {
    "goose".to_string()
}

// Metrics defaults
fn default_metrics_host() -> String {
    "0.0.0.0".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("COLLECTOR"))
            .build()?
            .try_deserialize()
    }

    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.metrics_host, self.metrics_port)
    }
}
