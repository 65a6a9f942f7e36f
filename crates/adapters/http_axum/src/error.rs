//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use homebox_domain::error::{ErrorKind, HomeboxError};
use homebox_domain::id::DriverId;
use homebox_domain::schema::ErrorDetail;

/// JSON error body returned by every endpoint.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u16,
    #[serde(rename = "type")]
    kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    driver: Option<DriverId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ErrorDetail>,
}

/// Maps [`HomeboxError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(HomeboxError);

impl From<HomeboxError> for ApiError {
    fn from(err: HomeboxError) -> Self {
        Self(err)
    }
}

fn status_of(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::BadRequest | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Connection => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        ErrorKind::Driver | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_of(kind);

        let body = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = ?self.0, "internal error");
                ErrorBody {
                    code: status.as_u16(),
                    kind,
                    message: None,
                    driver: None,
                    errors: Vec::new(),
                }
            }
            _ => {
                match kind {
                    ErrorKind::Driver => {
                        tracing::error!(
                            driver = ?self.0.driver_id(),
                            error = %self.0,
                            "driver fault"
                        );
                    }
                    ErrorKind::Connection => {
                        tracing::warn!(
                            driver = ?self.0.driver_id(),
                            error = %self.0,
                            "driver unreachable"
                        );
                    }
                    _ => tracing::debug!(error = %self.0, "request rejected"),
                }
                ErrorBody {
                    code: status.as_u16(),
                    kind,
                    message: Some(self.0.to_string()),
                    driver: self.0.driver_id().cloned(),
                    errors: self.0.details(),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    use homebox_domain::error::{
        BadRequestError, ConnectionError, DriverError, DriverFault, NotFoundError,
    };

    use super::*;

    async fn render(err: HomeboxError) -> (StatusCode, Value) {
        let response = ApiError::from(err).into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn should_render_not_found_with_message() {
        let (status, body) = render(NotFoundError::new("Driver", "hue").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"code": 404, "type": "NotFound", "message": "Driver not found: hue"})
        );
    }

    #[tokio::test]
    async fn should_render_itemized_errors_when_bad_request() {
        let err = BadRequestError::new(
            "payload does not match",
            vec![ErrorDetail::new("$.level", "must be at most 100")],
        );
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "BadRequest");
        assert_eq!(body["errors"][0]["path"], "$.level");
    }

    #[tokio::test]
    async fn should_tag_driver_when_driver_fault() {
        let err = DriverError::new(
            DriverId::new("hue"),
            DriverFault::Failed("bridge sent garbage".into()),
        );
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["type"], "Driver");
        assert_eq!(body["driver"], "hue");
    }

    #[tokio::test]
    async fn should_return_service_unavailable_when_connection_fails() {
        let (status, body) = render(ConnectionError::new("bulb offline").into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], 503);
    }

    #[tokio::test]
    async fn should_render_authentication_as_unauthorized() {
        let (status, body) = render(HomeboxError::Authentication("no token".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["type"], "Authentication");
    }

    #[tokio::test]
    async fn should_hide_details_when_internal() {
        let io = std::io::Error::other("disk on fire");
        let (status, body) = render(HomeboxError::internal(io)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"code": 500, "type": "Internal"}));
    }
}
