use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kairos_api::{app, metrics::Metrics, state::AppState, worker};
use kairos_availability::AvailabilityCalculator;
use kairos_booking::BookingCommitter;
use kairos_hold::{HoldPolicy, HoldTokenManager};
use kairos_store::{DbClient, PgBookingStore, PgDirectoryStore, RedisHoldStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kairos_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = kairos_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Kairos API on port {}", config.server.port);

    // Postgres connection and schema
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis-backed hold store
    let hold_store = RedisHoldStore::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");
    let hold_store: Arc<dyn kairos_core::repository::HoldStore> = Arc::new(hold_store);

    let directory = Arc::new(PgDirectoryStore::new(db.pool.clone()));
    let booking_store = Arc::new(PgBookingStore::new(db.pool.clone()));

    // Booking event fan-out for downstream notification consumers
    let (events_tx, _) = tokio::sync::broadcast::channel(100);

    let policy = HoldPolicy {
        ttl: Duration::from_secs(config.hold_rules.hold_ttl_seconds),
        extend_min_minutes: config.hold_rules.extend_min_minutes,
        extend_max_minutes: config.hold_rules.extend_max_minutes,
        max_lifetime_minutes: config.hold_rules.max_lifetime_minutes,
    };

    let availability = Arc::new(AvailabilityCalculator::new(
        directory.clone(),
        directory.clone(),
        directory.clone(),
        booking_store.clone(),
        hold_store.clone(),
    ));
    let holds = Arc::new(HoldTokenManager::new(
        directory.clone(),
        directory.clone(),
        booking_store.clone(),
        hold_store.clone(),
        policy,
    ));
    let committer = Arc::new(BookingCommitter::new(
        hold_store.clone(),
        directory.clone(),
        booking_store.clone(),
        events_tx.clone(),
    ));

    let metrics = Metrics::new();

    tokio::spawn(worker::start_hold_sweeper(
        hold_store.clone(),
        Duration::from_secs(config.hold_rules.sweep_interval_seconds),
        metrics.clone(),
    ));

    let app_state = AppState {
        availability,
        holds,
        committer,
        hold_store,
        metrics,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
