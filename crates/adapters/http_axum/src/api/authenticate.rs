//! JSON handlers for driver pairing.

use axum::Json;
use axum::extract::{Path, State};

use homebox_app::ports::{DeviceRepository, EventPublisher, EventStore};
use homebox_domain::authentication::{AuthenticationProcess, AuthenticationStepResult};
use homebox_domain::error::{HomeboxError, NotFoundError};
use homebox_domain::id::DriverId;

use super::{Payload, parse_key};
use crate::error::ApiError;
use crate::state::AppState;

/// Step ids are positions in the process; anything that is not one
/// (negative, non-numeric, past `usize::MAX`) names no step.
fn parse_step_id(step_id: &str) -> Result<usize, HomeboxError> {
    step_id
        .parse()
        .map_err(|_| NotFoundError::new("Authentication step", step_id).into())
}

/// `GET /authenticate/{driver}`
pub async fn describe<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path(driver): Path<String>,
) -> Result<Json<AuthenticationProcess>, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let driver: DriverId = parse_key(&driver)?;
    let process = state.authentication.describe_process(&driver).await?;
    Ok(Json(process))
}

/// `POST /authenticate/{driver}/{step_id}`
pub async fn execute_step<R, S, P>(
    State(state): State<AppState<R, S, P>>,
    Path((driver, step_id)): Path<(String, String)>,
    Payload(payload): Payload,
) -> Result<Json<AuthenticationStepResult>, ApiError>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let driver: DriverId = parse_key(&driver)?;
    let index = parse_step_id(&step_id)?;
    let result = state
        .authentication
        .execute_step(&driver, index, payload)
        .await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use homebox_domain::error::ErrorKind;

    use super::*;

    #[test]
    fn should_parse_numeric_step_id() {
        assert_eq!(parse_step_id("1").unwrap(), 1);
    }

    #[test]
    fn should_return_not_found_when_step_id_not_a_number() {
        let err = parse_step_id("first").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn should_return_not_found_when_step_id_negative() {
        let err = parse_step_id("-1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn should_return_not_found_when_step_id_overflows() {
        let err = parse_step_id("18446744073709551616").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
