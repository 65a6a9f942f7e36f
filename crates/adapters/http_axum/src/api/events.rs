//! JSON handlers for the event log.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use homebox_app::ports::{DeviceRepository, EventPublisher, EventStore};
use homebox_domain::error::HomeboxError;
use homebox_domain::event::Event;
use homebox_domain::time::parse_rfc3339;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /event/{event_type}`.
#[derive(Debug, Deserialize)]
pub struct ByTypeQuery {
    /// RFC 3339 lower bound, inclusive.
    pub from: Option<String>,
}

/// `GET /event/latestCommands`
pub async fn latest_by_command<R, S, P>(
    State(state): State<AppState<R, S, P>>,
) -> Result<Json<BTreeMap<String, Event>>, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    Ok(Json(state.events.latest_by_command().await?))
}

/// `GET /event/{event_type}?from=`
pub async fn by_type<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path(event_type): Path<String>,
    Query(query): Query<ByTypeQuery>,
) -> Result<Json<Vec<Event>>, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let since = query
        .from
        .as_deref()
        .map(|raw| parse_rfc3339("from", raw))
        .transpose()
        .map_err(HomeboxError::from)?;
    Ok(Json(state.events.by_type(&event_type, since).await?))
}
