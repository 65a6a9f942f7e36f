//! JSON handlers for devices.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use homebox_app::ports::{DeviceRepository, EventPublisher, EventStore};
use homebox_domain::device::Device;
use homebox_domain::id::{DeviceId, DriverId};

use super::{Payload, parse_key};
use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoints.
pub enum ListResponse {
    Ok(Json<Vec<Device>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<Device>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from endpoints that act on a device without
/// returning anything.
pub enum ActionResponse {
    NoContent,
}

impl IntoResponse for ActionResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /devices`
pub async fn list<R, S, P>(State(state): State<AppState<R, S, P>>) -> Result<ListResponse, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let devices = state.devices.list_devices().await?;
    Ok(ListResponse::Ok(Json(devices)))
}

/// `GET /devices/type/{device_type}`
pub async fn list_by_type<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path(device_type): Path<String>,
) -> Result<ListResponse, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let devices = state.devices.list_by_type(&device_type).await?;
    Ok(ListResponse::Ok(Json(devices)))
}

/// `GET /devices/driver/{driver}`
pub async fn list_by_driver<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path(driver): Path<String>,
) -> Result<ListResponse, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let driver: DriverId = parse_key(&driver)?;
    let devices = state.devices.list_by_driver(&driver).await?;
    Ok(ListResponse::Ok(Json(devices)))
}

/// `GET /discover/{driver}`
pub async fn discover<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path(driver): Path<String>,
) -> Result<ListResponse, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let driver: DriverId = parse_key(&driver)?;
    let devices = state.devices.discover(&driver).await?;
    Ok(ListResponse::Ok(Json(devices)))
}

/// `GET /device/{device_id}`
pub async fn get<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path(device_id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let device_id: DeviceId = parse_key(&device_id)?;
    let device = state.devices.get_device(&device_id).await?;
    Ok(GetResponse::Ok(Json(device)))
}

/// `POST /device/{device_id}/{command}`
pub async fn run_command<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path((device_id, command)): Path<(String, String)>,
    Payload(payload): Payload,
) -> Result<ActionResponse, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let device_id: DeviceId = parse_key(&device_id)?;
    state
        .commands
        .run_command(&device_id, &command, payload)
        .await?;
    Ok(ActionResponse::NoContent)
}

/// `POST /removeDevice/{device_id}`
pub async fn remove<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path(device_id): Path<String>,
) -> Result<ActionResponse, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let device_id: DeviceId = parse_key(&device_id)?;
    state.devices.remove_device(&device_id).await?;
    Ok(ActionResponse::NoContent)
}

/// `GET /device/{device_id}/failedRemovalInstructions`
pub async fn failed_removal_instructions<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path(device_id): Path<String>,
) -> Result<Json<Option<String>>, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let device_id: DeviceId = parse_key(&device_id)?;
    let instructions = state
        .devices
        .failed_removal_instructions(&device_id)
        .await?;
    Ok(Json(instructions))
}
