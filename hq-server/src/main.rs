//! Sentinel HQ Server
//!
//! Dashboard backend for Sentinel endpoint sensors.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SENTINEL HQ                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐  ┌────────────┐  ┌────────────────────────┐  │
//! │  │ Dashboard  │  │ Telemetry  │  │ Audit Ledger           │  │
//! │  │ Routes     │  │ Routes     │  │ (hash chained)         │  │
//! │  │ (Axum)     │  │ (sensors)  │  │                        │  │
//! │  └─────┬──────┘  └─────┬──────┘  └───────────┬────────────┘  │
//! │        └───────────────┼─────────────────────┘               │
//! │                        ▼                                     │
//! │                ┌───────────────┐                             │
//! │                │  dyn Store    │                             │
//! │                │ (Postgres or  │                             │
//! │                │  in-memory)   │                             │
//! │                └───────────────┘                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod audit;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod store;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::audit::{Actor, AuditLogger};
use crate::config::{Config, StoreBackend};
use crate::models::LogLevel;
use crate::store::{MemoryStore, PgStore, SharedStore};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hq_server=debug,tower_http=debug".into());
    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Sentinel HQ starting...");

    let store: SharedStore = match config.store_backend {
        StoreBackend::Postgres => {
            tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

            let pool = db::create_pool(&config.database_url)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;

            let store = PgStore::new(pool);
            store.seed().await.context("Failed to seed defaults")?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; nothing survives a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, config.clone());
    state
        .record(LogLevel::Info, "SYSTEM", "HQ server started")
        .await;

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub audit: AuditLogger,
    /// Identity stamped on audit entries written by dashboard actions
    pub actor: Actor,
    pub config: Config,
}

impl AppState {
    pub fn new(store: SharedStore, config: Config) -> Self {
        Self {
            audit: AuditLogger::new(store.clone()),
            actor: config.actor(),
            store,
            config,
        }
    }

    /// Append to the system log. Failures are logged and otherwise ignored.
    pub async fn record(&self, level: LogLevel, component: &str, message: &str) {
        if let Err(e) = self.store.add_system_log(level, component, message).await {
            tracing::warn!("Failed to write {} system log: {}", component, e);
        }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Dashboard routes
    let dashboard_routes = Router::new()
        .route("/api/apps", get(handlers::apps::list))
        .route("/api/audit", get(handlers::audit::list))
        .route("/api/command", post(handlers::command::queue))
        .route("/api/policy", get(handlers::policy::list).post(handlers::policy::update))
        .route("/api/stats", get(handlers::stats::dashboard))
        .route(
            "/api/system/config",
            get(handlers::system_config::get).post(handlers::system_config::update),
        )
        .route(
            "/api/system/gateways",
            get(handlers::gateways::list).post(handlers::gateways::update),
        )
        .route("/api/system/health", get(handlers::health::health_check))
        .route("/api/system/logs", get(handlers::logs::list));

    // Session routes
    let auth_routes = Router::new()
        .route("/api/auth", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout));

    // Sensor routes
    let telemetry_routes = Router::new()
        .route(
            "/api/telemetry/heartbeat",
            get(handlers::telemetry::sensors).post(handlers::telemetry::heartbeat),
        )
        .route(
            "/api/telemetry/alert",
            get(handlers::telemetry::alerts).post(handlers::telemetry::report_alert),
        );

    Router::new()
        .merge(dashboard_routes)
        .merge(auth_routes)
        .merge(telemetry_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}
