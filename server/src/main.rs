use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use parking_server::config::{Config, StorageBackend};
use parking_server::routes::create_routes;
use parking_server::services::seed::seed_demo_data;
use parking_server::services::SystemClock;
use parking_server::store::{MemoryStore, ParkingStore, PgStore};
use parking_server::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("parking_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let store: Arc<dyn ParkingStore> = match config.storage {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Successfully connected to database");

            sqlx::migrate!()
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Migrations run successfully");
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, config.civil_zone, Arc::new(SystemClock));
    if config.seed_demo_data {
        seed_demo_data(&state.lots)
            .await
            .expect("Failed to seed demo data");
    }

    let app: Router = create_routes(state, &config);

    tracing::info!(
        addr = %config.bind_addr,
        civil_offset = %config.civil_zone.offset(),
        "Parking server listening"
    );

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
