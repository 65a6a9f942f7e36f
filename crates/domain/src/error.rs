//! Common error types used across the workspace.
//!
//! Every failure is classified once, where it is detected, into one of the
//! [`ErrorKind`]s the boundary layer knows how to render. Layers above the
//! point of detection only propagate (and, for driver faults, tag the
//! offending driver id).

use std::fmt;

use serde::Serialize;

use crate::driver::Capability;
use crate::id::DriverId;
use crate::schema::{ErrorDetail, SchemaError};

/// Stable, boundary-facing classification of a [`HomeboxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Validation,
    Driver,
    Connection,
    Authentication,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::BadRequest => "BadRequest",
            Self::Validation => "Validation",
            Self::Driver => "Driver",
            Self::Connection => "Connection",
            Self::Authentication => "Authentication",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the homebox workspace.
#[derive(Debug, thiserror::Error)]
pub enum HomeboxError {
    /// Unknown driver, device, command, event type or step index.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// A caller-supplied payload failed its declared schema.
    #[error(transparent)]
    BadRequest(#[from] BadRequestError),

    /// A caller-supplied value broke a domain invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A driver violated its declared contract.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// A driver could not reach its device or service.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The caller is not allowed to perform the action.
    #[error("not authorized: {0}")]
    Authentication(String),

    /// Anything uncategorized (storage failures, panicked tasks, …).
    #[error("internal error")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HomeboxError {
    /// Boundary classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Driver(_) => ErrorKind::Driver,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The driver this error is attributed to, when known.
    #[must_use]
    pub fn driver_id(&self) -> Option<&DriverId> {
        match self {
            Self::Driver(err) => err.driver.as_ref(),
            Self::Connection(err) => err.driver.as_ref(),
            _ => None,
        }
    }

    /// Itemized field errors carried by `BadRequest` and `Validation`.
    #[must_use]
    pub fn details(&self) -> Vec<ErrorDetail> {
        match self {
            Self::BadRequest(err) => err.errors.clone(),
            Self::Validation(err) => err.details(),
            _ => Vec::new(),
        }
    }

    /// Attribute a driver or connection fault to `driver` unless it is
    /// already tagged. Other kinds are returned unchanged.
    #[must_use]
    pub fn tag_driver(self, driver: &DriverId) -> Self {
        match self {
            Self::Driver(mut err) => {
                err.driver.get_or_insert_with(|| driver.clone());
                Self::Driver(err)
            }
            Self::Connection(mut err) => {
                err.driver.get_or_insert_with(|| driver.clone());
                Self::Connection(err)
            }
            other => other,
        }
    }

    /// Wrap any error as [`HomeboxError::Internal`].
    pub fn internal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal(Box::new(err))
    }
}

/// Lookup of an unknown resource.
#[derive(Debug, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    /// What kind of thing was looked up (`"Driver"`, `"Device"`, …).
    pub entity: &'static str,
    /// The identifier that did not resolve.
    pub id: String,
}

impl NotFoundError {
    pub fn new(entity: &'static str, id: impl fmt::Display) -> Self {
        Self {
            entity,
            id: id.to_string(),
        }
    }
}

/// A caller payload rejected by schema validation.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct BadRequestError {
    pub message: String,
    pub errors: Vec<ErrorDetail>,
}

impl BadRequestError {
    pub fn new(message: impl Into<String>, errors: Vec<ErrorDetail>) -> Self {
        Self {
            message: message.into(),
            errors,
        }
    }
}

/// Domain invariant violations on caller-supplied values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    /// Itemized form of this error, one entry per offending field.
    #[must_use]
    pub fn details(&self) -> Vec<ErrorDetail> {
        let field = match self {
            Self::Empty { field } | Self::Invalid { field, .. } => *field,
        };
        vec![ErrorDetail::new(format!("$.{field}"), self.to_string())]
    }
}

/// A driver broke its contract.
#[derive(Debug, thiserror::Error)]
pub struct DriverError {
    /// The offending driver; filled in by [`HomeboxError::tag_driver`] when
    /// the fault is raised without knowing it.
    pub driver: Option<DriverId>,
    pub fault: DriverFault,
}

impl DriverError {
    #[must_use]
    pub fn new(driver: DriverId, fault: DriverFault) -> Self {
        Self {
            driver: Some(driver),
            fault,
        }
    }

    #[must_use]
    pub fn untagged(fault: DriverFault) -> Self {
        Self {
            driver: None,
            fault,
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.driver {
            Some(driver) => write!(f, "driver {driver}: {}", self.fault),
            None => self.fault.fmt(f),
        }
    }
}

/// The specific way a driver broke its contract.
#[derive(Debug, thiserror::Error)]
pub enum DriverFault {
    #[error("no schema declared for {kind} `{name}`")]
    MissingSchema { kind: &'static str, name: String },

    #[error("malformed schema")]
    MalformedSchema(#[from] SchemaError),

    #[error("authentication step {index} does not match its declared schema")]
    InvalidStep {
        index: usize,
        errors: Vec<ErrorDetail>,
    },

    #[error("authentication step result does not match the result schema")]
    InvalidStepResult { errors: Vec<ErrorDetail> },

    #[error("authentication process changed during pairing (step {index} is now `{found}`, expected `{expected}`)")]
    ProcessChanged {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("event `{event_type}` does not match its declared schema")]
    InvalidEvent {
        event_type: String,
        errors: Vec<ErrorDetail>,
    },

    #[error("discovered device `{device}` is invalid: {reason}")]
    InvalidDevice { device: String, reason: String },

    #[error("{kind} name `{name}` is reserved")]
    ReservedName { kind: &'static str, name: String },

    #[error("capability {0} is not implemented")]
    CapabilityNotImplemented(Capability),

    #[error("{0}")]
    Failed(String),
}

/// A driver could not reach the underlying device or service.
#[derive(Debug, thiserror::Error)]
#[error("connection failed: {message}")]
pub struct ConnectionError {
    pub driver: Option<DriverId>,
    pub message: String,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            driver: None,
            message: message.into(),
        }
    }
}
