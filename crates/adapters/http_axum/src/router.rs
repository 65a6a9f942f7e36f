//! Axum router assembly.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use homebox_app::ports::{DeviceRepository, EventPublisher, EventStore};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Merges the JSON routes with `/` and `/health`. Includes a
/// [`TraceLayer`] that logs each HTTP request/response at the `DEBUG` level
/// using the `tracing` ecosystem.
pub fn build<R, S, P>(state: AppState<R, S, P>) -> Router
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .merge(crate::api::routes::<R, S, P>())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> Json<Value> {
    Json(json!({ "homebox": "Oh, hi!" }))
}

async fn health_check() -> &'static str {
    "OK"
}
