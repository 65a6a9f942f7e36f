//! End-to-end tests for the full homeboxd stack.
//!
//! Each test spins up the complete application (in-memory `SQLite`, real repos,
//! the virtual driver, real services, real axum router) and exercises the
//! HTTP layer via `tower::ServiceExt::oneshot`; no TCP port is bound.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use homebox_adapter_http_axum::router;
use homebox_adapter_http_axum::state::AppState;
use homebox_adapter_storage_sqlite_sqlx::{Config, SqliteDeviceRepository, SqliteEventStore};
use homebox_app::event_bus::InProcessEventBus;
use homebox_app::ports::DriverContext;
use homebox_app::registry::{DriverCatalog, DriverRegistry, RegistryConfig};
use homebox_app::services::driver_context::ServiceContext;
use homebox_app::services::event_pipeline::EventPipeline;
use homebox_domain::id::DriverId;

/// Build a fully-wired router backed by an in-memory `SQLite` database, with
/// the virtual driver loaded from `settings` and started.
async fn app_with(settings: Value) -> Router {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise");
    let pool = db.pool().clone();

    let catalog = DriverCatalog::new().register(
        homebox_adapter_virtual::DRIVER_ID,
        homebox_adapter_virtual::factory,
    );
    let driver = DriverId::new(homebox_adapter_virtual::DRIVER_ID);
    let config = RegistryConfig {
        enabled: vec![driver.clone()],
        skip_failed: false,
        settings: BTreeMap::from([(driver, settings)]),
    };
    let registry = Arc::new(DriverRegistry::load(&catalog, &config).expect("virtual driver loads"));

    let event_bus = Arc::new(InProcessEventBus::new(64));
    let events = Arc::new(EventPipeline::new(
        SqliteEventStore::new(pool.clone()),
        Arc::clone(&event_bus),
        Arc::clone(&registry),
    ));
    let state = AppState::new(
        Arc::clone(&registry),
        Arc::new(SqliteDeviceRepository::new(pool)),
        events,
        event_bus,
    );

    registry
        .start(|driver| -> Arc<dyn DriverContext> {
            Arc::new(ServiceContext::new(
                driver.clone(),
                Arc::clone(&state.devices),
                Arc::clone(&state.events),
            ))
        })
        .await
        .expect("virtual driver starts");

    router::build(state)
}

async fn app() -> Router {
    app_with(json!({})).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    call(app, request).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    call(app, request).await
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

// ---------------------------------------------------------------------------
// Health & greeting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let app = app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn should_greet_on_root() {
    let app = app().await;
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["homebox"], "Oh, hi!");
}

// ---------------------------------------------------------------------------
// Pairing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_pair_in_two_steps_then_reject_third_step() {
    let app = app().await;

    let (status, process) = get(&app, "/authenticate/virtual").await;
    assert_eq!(status, StatusCode::OK);
    let process = process.as_array().unwrap();
    assert_eq!(process.len(), 2);
    assert_eq!(process[0]["type"], "apiKey");
    assert_eq!(process[1]["type"], "confirm");

    let (status, result) = post(&app, "/authenticate/virtual/0", json!({"key": "abc"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["success"], true);

    let (status, result) = post(&app, "/authenticate/virtual/1", json!({"confirmed": true})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["success"], true);

    let (status, body) = post(&app, "/authenticate/virtual/2", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["type"], "NotFound");
}

#[tokio::test]
async fn should_return_not_found_when_step_id_names_no_step() {
    let app = app().await;

    for step_id in ["18446744073709551616", "-1", "first"] {
        let uri = format!("/authenticate/virtual/{step_id}");
        let (status, body) = post(&app, &uri, json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "step id {step_id}");
        assert_eq!(body["type"], "NotFound");
    }
}

#[tokio::test]
async fn should_report_failed_step_when_key_rejected() {
    let app = app_with(json!({"api_key": "s3cret"})).await;

    let (status, result) = post(&app, "/authenticate/virtual/0", json!({"key": "guess"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["success"], false);
    assert!(result["message"].is_string());
}

#[tokio::test]
async fn should_return_bad_request_when_step_answer_missing_field() {
    let app = app().await;

    let (status, body) = post(&app, "/authenticate/virtual/0", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "BadRequest");
    assert!(!body["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn should_return_not_found_when_pairing_unknown_driver() {
    let app = app().await;
    let (status, body) = get(&app, "/authenticate/hue").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_register_devices_when_driver_starts() {
    let app = app().await;

    let (status, devices) = get(&app, "/devices").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = devices
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["light-desk", "switch-fan"]);

    let (_, lights) = get(&app, "/devices/type/light").await;
    assert_eq!(lights.as_array().unwrap().len(), 1);

    let (_, owned) = get(&app, "/devices/driver/virtual").await;
    assert_eq!(owned.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn should_discover_configured_devices() {
    let app = app_with(json!({"lights": ["desk", "ceiling"], "switches": []})).await;

    let (status, found) = get(&app, "/discover/virtual").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn should_return_not_found_when_device_unknown() {
    let app = app().await;
    let (status, body) = get(&app, "/device/light-attic").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["type"], "NotFound");
}

#[tokio::test]
async fn should_remove_device_then_forget_it() {
    let app = app().await;

    let (status, _) = get(&app, "/device/switch-fan/failedRemovalInstructions").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&app, "/removeDevice/switch-fan", json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = get(&app, "/device/switch-fan").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Commands & events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_reject_out_of_range_level_then_accept_valid_one() {
    let app = app().await;

    let (status, body) = post(
        &app,
        "/device/light-desk/setBrightness",
        json!({"level": 150}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "BadRequest");
    assert_eq!(body["errors"][0]["path"], "$.level");

    let (status, body) = post(
        &app,
        "/device/light-desk/setBrightness",
        json!({"level": 50}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn should_return_not_found_when_command_targets_unknown_device() {
    let app = app().await;
    let (status, _) = post(&app, "/device/dev1/setBrightness", json!({"level": 50})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_return_not_found_when_device_lacks_command() {
    let app = app().await;
    let (status, _) = post(&app, "/device/switch-fan/setBrightness", json!({"level": 50})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_record_events_emitted_by_commands() {
    let app = app().await;

    post(&app, "/device/light-desk/setBrightness", json!({"level": 30})).await;
    post(&app, "/device/light-desk/setBrightness", json!({"level": 60})).await;
    post(&app, "/device/switch-fan/toggle", json!({})).await;

    let (status, latest) = get(&app, "/event/latestCommands").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["brightness"]["payload"]["level"], 60);
    assert_eq!(latest["power"]["device_id"], "switch-fan");

    let (status, history) = get(&app, "/event/brightness").await;
    assert_eq!(status, StatusCode::OK);
    let levels: Vec<i64> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["payload"]["level"].as_i64().unwrap())
        .collect();
    assert_eq!(levels, vec![30, 60]);

    let (_, again) = get(&app, "/event/brightness").await;
    assert_eq!(again, history);
}

#[tokio::test]
async fn should_filter_events_by_from_timestamp() {
    let app = app().await;
    post(&app, "/device/light-desk/setBrightness", json!({"level": 30})).await;

    let (status, future) = get(&app, "/event/brightness?from=2999-01-01T00:00:00Z").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(future, json!([]));

    let (status, body) = get(&app, "/event/brightness?from=soon").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "Validation");
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_describe_loaded_drivers() {
    let app = app().await;

    let (status, drivers) = get(&app, "/drivers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(drivers[0]["id"], "virtual");
    assert_eq!(drivers[0]["devices"], 2);

    let (_, commands) = get(&app, "/drivers/commands").await;
    let names: Vec<&str> = commands["virtual"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"setBrightness"));

    let (_, events) = get(&app, "/drivers/events").await;
    assert_eq!(events["virtual"].as_array().unwrap().len(), 2);

    let (status, instructions) = get(&app, "/driver/virtual/pairingInstructions").await;
    assert_eq!(status, StatusCode::OK);
    assert!(instructions.is_string());
}
