//! Authentication engine: runs a driver's pairing flow one step at a time.
//!
//! The engine holds no state between calls: every call re-reads the
//! driver's process description, which is authoritative. Step indices are
//! positions in that description. Callers that want the step types pinned
//! for one pairing attempt use [`PairingSession`](super::pairing::PairingSession).
//!
//! Fault attribution:
//! - a step descriptor without a registered schema, or not matching it, is a
//!   driver contract fault,
//! - a caller answer not matching the step's `returned` schema is a bad
//!   request and never reaches the driver,
//! - a step result not matching the result schema is a driver contract fault.

use std::sync::Arc;

use serde_json::Value;

use homebox_domain::authentication::{
    AuthenticationProcess, AuthenticationSchemas, AuthenticationStepResult,
};
use homebox_domain::driver::Capability;
use homebox_domain::error::{BadRequestError, DriverFault, HomeboxError, NotFoundError};
use homebox_domain::id::DriverId;
use homebox_domain::schema::validate;

use crate::registry::{DriverHandle, DriverRegistry, contract_fault};

/// Generic multi-step pairing, validated at every hop.
pub struct AuthenticationEngine {
    registry: Arc<DriverRegistry>,
}

impl AuthenticationEngine {
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        Self { registry }
    }

    /// Fetch and check the pairing process of `driver`.
    ///
    /// Every step descriptor must match the `requested` schema of its type;
    /// a single bad step fails the whole call.
    ///
    /// # Errors
    ///
    /// - [`HomeboxError::NotFound`] if the driver is not loaded or does not
    ///   implement authentication.
    /// - [`HomeboxError::Driver`] tagged with the driver id if a step type
    ///   has no schema or a descriptor does not match it.
    #[tracing::instrument(skip(self))]
    pub async fn describe_process(
        &self,
        driver: &DriverId,
    ) -> Result<AuthenticationProcess, HomeboxError> {
        let handle = self.registry.require(driver, Capability::Authentication)?;
        let (process, schemas) = fetch_process(&handle).await?;

        for (index, step) in process.steps().iter().enumerate() {
            let requested = schemas.requested(&step.step_type).ok_or_else(|| {
                contract_fault(
                    handle.id(),
                    DriverFault::MissingSchema {
                        kind: "authentication step",
                        name: step.step_type.clone(),
                    },
                )
            })?;
            let result = validate(&step.to_value(), requested)
                .map_err(|err| contract_fault(handle.id(), err.into()))?;
            result.into_result().map_err(|errors| {
                contract_fault(handle.id(), DriverFault::InvalidStep { index, errors })
            })?;
        }

        tracing::debug!(steps = process.len(), "authentication process described");
        Ok(process)
    }

    /// Submit the caller's answer to step `index` of `driver`'s process.
    ///
    /// # Errors
    ///
    /// - [`HomeboxError::NotFound`] if the driver is unknown, lacks
    ///   authentication, or `index` is past the end of the process. The
    ///   driver's step handler is not invoked.
    /// - [`HomeboxError::BadRequest`] if `payload` does not match the step's
    ///   `returned` schema. The driver's step handler is not invoked.
    /// - [`HomeboxError::Driver`] if the step type has no schema or the
    ///   handler's result breaks the result schema.
    /// - Any error the step handler itself returns.
    #[tracing::instrument(skip(self, payload))]
    pub async fn execute_step(
        &self,
        driver: &DriverId,
        index: usize,
        payload: Value,
    ) -> Result<AuthenticationStepResult, HomeboxError> {
        self.execute(driver, index, None, payload).await
    }

    /// Like [`execute_step`](Self::execute_step), but first checks that step
    /// `index` still has type `expected_type`.
    ///
    /// # Errors
    ///
    /// As [`execute_step`](Self::execute_step), plus
    /// [`DriverFault::ProcessChanged`] when the step type moved.
    #[tracing::instrument(skip(self, payload))]
    pub async fn execute_pinned_step(
        &self,
        driver: &DriverId,
        index: usize,
        expected_type: &str,
        payload: Value,
    ) -> Result<AuthenticationStepResult, HomeboxError> {
        self.execute(driver, index, Some(expected_type), payload)
            .await
    }

    async fn execute(
        &self,
        driver: &DriverId,
        index: usize,
        expected_type: Option<&str>,
        payload: Value,
    ) -> Result<AuthenticationStepResult, HomeboxError> {
        let handle = self.registry.require(driver, Capability::Authentication)?;
        let (process, schemas) = fetch_process(&handle).await?;

        let step = process
            .step(index)
            .ok_or_else(|| NotFoundError::new("Authentication step", index))?;

        if let Some(expected) = expected_type.filter(|expected| *expected != step.step_type) {
            return Err(contract_fault(
                handle.id(),
                DriverFault::ProcessChanged {
                    index,
                    expected: expected.to_string(),
                    found: step.step_type.clone(),
                },
            ));
        }

        let returned = schemas.returned(&step.step_type).ok_or_else(|| {
            contract_fault(
                handle.id(),
                DriverFault::MissingSchema {
                    kind: "authentication step",
                    name: step.step_type.clone(),
                },
            )
        })?;
        let checked = validate(&payload, returned)
            .map_err(|err| contract_fault(handle.id(), err.into()))?;
        if let Err(errors) = checked.into_result() {
            tracing::debug!(step_type = %step.step_type, "rejecting authentication payload");
            return Err(BadRequestError::new(
                format!("payload does not match the `{}` step", step.step_type),
                errors,
            )
            .into());
        }

        let result = handle
            .call(move |driver| async move { driver.authentication_step(index, payload).await })
            .await?;

        let rendered = serde_json::to_value(&result).map_err(HomeboxError::internal)?;
        validate(&rendered, &AuthenticationStepResult::schema())
            .map_err(|err| contract_fault(handle.id(), err.into()))?
            .into_result()
            .map_err(|errors| {
                contract_fault(handle.id(), DriverFault::InvalidStepResult { errors })
            })?;

        tracing::info!(
            driver = %handle.id(),
            index,
            success = result.success,
            "authentication step executed"
        );
        Ok(result)
    }
}

/// The driver's process plus its step schemas layered over the built-ins.
async fn fetch_process(
    handle: &DriverHandle,
) -> Result<(AuthenticationProcess, AuthenticationSchemas), HomeboxError> {
    handle
        .call(|driver| async move {
            let steps = driver.authentication_process().await?;
            let custom = driver.authentication_schemas().await?;
            Ok((
                steps.into_iter().collect(),
                AuthenticationSchemas::builtin().merged(custom),
            ))
        })
        .await
}
