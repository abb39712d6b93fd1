mod client;
mod config;
mod event_store;
mod migration;
mod models;

pub use client::PostgresClient;
pub use config::PostgresConfig;
pub use event_store::PostgresEventStore;
pub use migration::MigrationRunner;
pub use models::EventRow;
