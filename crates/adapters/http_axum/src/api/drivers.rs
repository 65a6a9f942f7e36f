//! JSON handlers for driver introspection.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};

use homebox_app::ports::{DeviceRepository, EventPublisher, EventStore};
use homebox_domain::command::CommandDescription;
use homebox_domain::driver::DriverSummary;
use homebox_domain::event::EventDescription;
use homebox_domain::id::DriverId;

use super::parse_key;
use crate::error::ApiError;
use crate::state::AppState;

/// `GET /drivers`
pub async fn list<R, S, P>(
    State(state): State<AppState<R, S, P>>,
) -> Result<Json<Vec<DriverSummary>>, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    Ok(Json(state.drivers.list_drivers().await?))
}

/// `GET /drivers/commands`
pub async fn commands<R, S, P>(
    State(state): State<AppState<R, S, P>>,
) -> Result<Json<BTreeMap<DriverId, Vec<CommandDescription>>>, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    Ok(Json(state.drivers.commands().await?))
}

/// `GET /drivers/events`
pub async fn events<R, S, P>(
    State(state): State<AppState<R, S, P>>,
) -> Result<Json<BTreeMap<DriverId, Vec<EventDescription>>>, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    Ok(Json(state.drivers.events().await?))
}

/// `GET /driver/{driver}/pairingInstructions`
pub async fn pairing_instructions<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path(driver): Path<String>,
) -> Result<Json<Option<String>>, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let driver: DriverId = parse_key(&driver)?;
    Ok(Json(state.drivers.pairing_instructions(&driver).await?))
}
