//! # homeboxd: homebox daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (`homebox.toml`, env vars) and install logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Load the enabled drivers from the driver catalog
//! - Construct application services, injecting repositories via port traits
//! - Start every driver with its own context
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT), then tear drivers down
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use homebox_adapter_http_axum::state::AppState;
use homebox_adapter_storage_sqlite_sqlx::{SqliteDeviceRepository, SqliteEventStore};
use homebox_app::event_bus::InProcessEventBus;
use homebox_app::ports::DriverContext;
use homebox_app::registry::{DriverCatalog, DriverRegistry};
use homebox_app::services::driver_context::ServiceContext;
use homebox_app::services::event_pipeline::EventPipeline;

use crate::config::Config;

const EVENT_BUS_CAPACITY: usize = 256;

/// Every driver this build knows how to instantiate.
fn catalog() -> DriverCatalog {
    DriverCatalog::new().register(
        homebox_adapter_virtual::DRIVER_ID,
        homebox_adapter_virtual::factory,
    )
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn init_logging(filter: &str) -> Result<(), BoxError> {
    let filter = EnvFilter::try_new(filter)?;
    tracing_subscriber::fmt().with_env_filter(filter).try_init()
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::load()?;
    init_logging(&config.logging.filter)?;

    // Database
    let db = homebox_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Repositories
    let device_repo = Arc::new(SqliteDeviceRepository::new(pool.clone()));
    let event_store = SqliteEventStore::new(pool);

    // Drivers
    let registry = Arc::new(DriverRegistry::load(&catalog(), &config.registry_config()?)?);

    // Services
    let event_bus = Arc::new(InProcessEventBus::new(EVENT_BUS_CAPACITY));
    let events = Arc::new(EventPipeline::new(
        event_store,
        Arc::clone(&event_bus),
        Arc::clone(&registry),
    ));
    let state = AppState::new(Arc::clone(&registry), device_repo, events, event_bus);

    registry
        .start(|driver| -> Arc<dyn DriverContext> {
            Arc::new(ServiceContext::new(
                driver.clone(),
                Arc::clone(&state.devices),
                Arc::clone(&state.events),
            ))
        })
        .await?;

    // HTTP
    let app = homebox_adapter_http_axum::router::build(state);
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "homeboxd listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    registry.shutdown().await;
    tracing::info!("homeboxd stopped");
    served?;
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown requested");
}
