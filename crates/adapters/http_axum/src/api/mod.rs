//! JSON handler modules and the route table.

#[allow(clippy::missing_errors_doc)]
pub mod authenticate;
#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod drivers;
#[allow(clippy::missing_errors_doc)]
pub mod events;
pub mod sse;

use std::str::FromStr;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::routing::{get, post};
use serde_json::{Map, Value};

use homebox_app::ports::{DeviceRepository, EventPublisher, EventStore};
use homebox_domain::error::{BadRequestError, HomeboxError, ValidationError};

use crate::error::ApiError;
use crate::state::AppState;

/// A JSON request body. An empty body reads as `{}`, so commands and
/// steps without parameters can be posted bare.
#[derive(Debug)]
pub struct Payload(pub Value);

impl<St> FromRequest<St> for Payload
where
    St: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|err| {
            HomeboxError::from(BadRequestError::new(err.body_text(), Vec::new()))
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(Value::Object(Map::new())));
        }
        serde_json::from_slice(&bytes).map(Self).map_err(|err| {
            HomeboxError::from(BadRequestError::new(
                format!("request body is not valid JSON: {err}"),
                Vec::new(),
            ))
            .into()
        })
    }
}

/// Parse a path segment into a typed key; blank keys are rejected.
pub(crate) fn parse_key<K>(raw: &str) -> Result<K, ApiError>
where
    K: FromStr<Err = ValidationError>,
{
    raw.parse::<K>()
        .map_err(|err| ApiError::from(HomeboxError::from(err)))
}

/// Build the sub-router holding every JSON route.
pub fn routes<R, S, P>() -> Router<AppState<R, S, P>>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        // Pairing
        .route(
            "/authenticate/{driver}",
            get(authenticate::describe::<R, S, P>),
        )
        .route(
            "/authenticate/{driver}/{step_id}",
            post(authenticate::execute_step::<R, S, P>),
        )
        // Devices
        .route("/discover/{driver}", get(devices::discover::<R, S, P>))
        .route("/devices", get(devices::list::<R, S, P>))
        .route(
            "/devices/type/{device_type}",
            get(devices::list_by_type::<R, S, P>),
        )
        .route(
            "/devices/driver/{driver}",
            get(devices::list_by_driver::<R, S, P>),
        )
        .route("/device/{device_id}", get(devices::get::<R, S, P>))
        .route(
            "/device/{device_id}/failedRemovalInstructions",
            get(devices::failed_removal_instructions::<R, S, P>),
        )
        .route(
            "/device/{device_id}/{command}",
            post(devices::run_command::<R, S, P>),
        )
        .route(
            "/removeDevice/{device_id}",
            post(devices::remove::<R, S, P>),
        )
        // Drivers
        .route("/drivers", get(drivers::list::<R, S, P>))
        .route("/drivers/commands", get(drivers::commands::<R, S, P>))
        .route("/drivers/events", get(drivers::events::<R, S, P>))
        .route(
            "/driver/{driver}/pairingInstructions",
            get(drivers::pairing_instructions::<R, S, P>),
        )
        // Events
        .route(
            "/event/latestCommands",
            get(events::latest_by_command::<R, S, P>),
        )
        .route("/event/stream", get(sse::stream::<R, S, P>))
        .route("/event/{event_type}", get(events::by_type::<R, S, P>))
}
