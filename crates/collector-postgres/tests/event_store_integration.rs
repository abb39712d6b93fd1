use chrono::{DateTime, Utc};
use collector_domain::{EventStore, ValidatedEvent};
use collector_postgres::{MigrationRunner, PostgresClient, PostgresConfig, PostgresEventStore};
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

fn sample_event(event_id: &str) -> ValidatedEvent {
    ValidatedEvent {
        event_id: event_id.to_string(),
        timestamp: DateTime::parse_from_rfc3339("2025-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
        source: "facebook".to_string(),
        funnel_stage: "top".to_string(),
        event_type: "ad.view".to_string(),
        data: serde_json::json!({
            "user": { "userId": "user_123" },
            "engagement": { "referrer": "newsfeed", "videoId": null }
        }),
    }
}

async fn setup() -> (
    testcontainers::ContainerAsync<Postgres>,
    PostgresEventStore,
) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let config = PostgresConfig {
        host: host.to_string(),
        port,
        database: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
        max_pool_size: 5,
    };

    let client = PostgresClient::new(&config).unwrap();
    client.ping().await.unwrap();

    let migrations_dir = format!("{}/migrations", env!("CARGO_MANIFEST_DIR"));
    let runner = MigrationRunner::new("goose".to_string(), migrations_dir, config.dsn());
    runner.run_migrations().await.unwrap();

    (postgres, PostgresEventStore::new(client))
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_postgres_connection() {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let config = PostgresConfig {
        host: host.to_string(),
        port,
        database: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
        max_pool_size: 5,
    };

    let client = PostgresClient::new(&config).unwrap();
    client.ping().await.unwrap();
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_persist_and_fetch_event() {
    let (_postgres, store) = setup().await;

    let event = sample_event("evt_123");
    store.persist(&event).await.unwrap();

    let row = store.get_event("evt_123").await.unwrap().unwrap();
    assert_eq!(row.event_id, "evt_123");
    assert_eq!(row.timestamp, event.timestamp);
    assert_eq!(row.funnel_stage, "top");
    assert_eq!(row.event_type, "ad.view");
    assert_eq!(row.data["user"]["userId"], "user_123");
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_duplicate_persist_is_idempotent() {
    let (_postgres, store) = setup().await;

    // Redelivery of an already-committed event must succeed and commit nothing
    let event = sample_event("evt_dup");
    store.persist(&event).await.unwrap();
    store.persist(&event).await.unwrap();

    let row = store.get_event("evt_dup").await.unwrap().unwrap();
    assert_eq!(row.event_id, "evt_dup");
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_get_missing_event_returns_none() {
    let (_postgres, store) = setup().await;

    assert!(store.get_event("evt_missing").await.unwrap().is_none());
}
