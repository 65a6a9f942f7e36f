//! Command dispatcher: validates a command and routes it to the driver
//! owning the target device.

use std::sync::Arc;

use serde_json::Value;

use homebox_domain::driver::Capability;
use homebox_domain::error::{
    BadRequestError, ConnectionError, DriverFault, HomeboxError, NotFoundError,
};
use homebox_domain::id::DeviceId;
use homebox_domain::schema::validate;

use crate::ports::DeviceRepository;
use crate::registry::{DriverRegistry, contract_fault};

/// Fire-and-acknowledge command routing. No retries.
pub struct CommandDispatcher<R> {
    devices: R,
    registry: Arc<DriverRegistry>,
}

impl<R: DeviceRepository> CommandDispatcher<R> {
    pub fn new(devices: R, registry: Arc<DriverRegistry>) -> Self {
        Self { devices, registry }
    }

    /// Run `command` with `payload` on `device_id`.
    ///
    /// # Errors
    ///
    /// - [`HomeboxError::NotFound`] for an unknown device, a device whose
    ///   driver is not loaded or lacks commands, or a command the device
    ///   does not list. No driver is invoked.
    /// - [`HomeboxError::Driver`] if the driver declares no schema for a
    ///   command the device lists.
    /// - [`HomeboxError::BadRequest`] if `payload` does not match the
    ///   command's schema. The handler is not invoked.
    /// - [`HomeboxError::Connection`] if the handler itself fails.
    #[tracing::instrument(skip(self, payload))]
    pub async fn run_command(
        &self,
        device_id: &DeviceId,
        command: &str,
        payload: Value,
    ) -> Result<(), HomeboxError> {
        let device = self
            .devices
            .get_by_id(device_id)
            .await?
            .ok_or_else(|| NotFoundError::new("Device", device_id))?;
        let handle = self.registry.require(&device.driver, Capability::Commands)?;
        if !device.supports_command(command) {
            return Err(NotFoundError::new("Command", command).into());
        }

        let declared = handle
            .call(|driver| async move { driver.commands().await })
            .await?;
        let description = declared
            .iter()
            .find(|description| description.name == command)
            .ok_or_else(|| {
                contract_fault(
                    handle.id(),
                    DriverFault::MissingSchema {
                        kind: "command",
                        name: command.to_string(),
                    },
                )
            })?;

        let checked = validate(&payload, &description.schema)
            .map_err(|err| contract_fault(handle.id(), err.into()))?;
        if let Err(errors) = checked.into_result() {
            return Err(BadRequestError::new(
                format!("payload does not match command `{command}`"),
                errors,
            )
            .into());
        }

        let name = command.to_string();
        handle
            .call(move |driver| async move {
                driver
                    .run_command(&device, &name, payload)
                    .await
                    .map_err(as_connection_fault)
            })
            .await
            .inspect_err(|err| {
                if let HomeboxError::Connection(fault) = err {
                    tracing::warn!(driver = %handle.id(), error = %fault, "command handler failed");
                }
            })?;

        tracing::debug!(driver = %handle.id(), "command dispatched");
        Ok(())
    }
}

/// Handler failures are connection faults unless the driver already
/// classified them as a contract or connection fault.
fn as_connection_fault(err: HomeboxError) -> HomeboxError {
    match err {
        HomeboxError::Driver(_) | HomeboxError::Connection(_) | HomeboxError::Internal(_) => err,
        other => ConnectionError::new(other.to_string()).into(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use homebox_domain::command::CommandDescription;
    use homebox_domain::driver::Capabilities;
    use homebox_domain::error::ErrorKind;
    use homebox_domain::id::DriverId;
    use homebox_domain::schema::Schema;

    use super::*;
    use crate::ports::Driver;
    use crate::testing::{InMemoryDeviceRepo, StubDriver, device};

    fn brightness() -> CommandDescription {
        CommandDescription::new(
            "setBrightness",
            Schema::object().required_property("level", Schema::integer_range(0, 100)),
        )
    }

    fn setup(driver: StubDriver) -> (CommandDispatcher<Arc<InMemoryDeviceRepo>>, Arc<StubDriver>) {
        let repo = Arc::new(InMemoryDeviceRepo::default());
        let mut dev1 = device("dev1", "stub");
        dev1.commands = vec!["setBrightness".into(), "reboot".into()];
        repo.insert(dev1);

        let driver = Arc::new(driver);
        let registry = DriverRegistry::from_drivers([(
            DriverId::new("stub"),
            Arc::clone(&driver) as Arc<dyn Driver>,
        )]);
        (CommandDispatcher::new(repo, Arc::new(registry)), driver)
    }

    fn lamp_driver() -> StubDriver {
        StubDriver::new(Capabilities::none().with(Capability::Commands))
            .with_commands(vec![brightness()])
    }

    #[tokio::test]
    async fn should_dispatch_valid_command() {
        let (dispatcher, driver) = setup(lamp_driver());
        dispatcher
            .run_command(&DeviceId::new("dev1"), "setBrightness", json!({"level": 50}))
            .await
            .unwrap();
        assert_eq!(driver.calls(), vec!["run_command:dev1:setBrightness"]);
    }

    #[tokio::test]
    async fn should_reject_out_of_range_payload_with_itemized_error() {
        let (dispatcher, driver) = setup(lamp_driver());
        let err = dispatcher
            .run_command(&DeviceId::new("dev1"), "setBrightness", json!({"level": 150}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BadRequest);
        let details = err.details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].path, "$.level");
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn should_return_not_found_without_invoking_driver_when_device_unknown() {
        let (dispatcher, driver) = setup(lamp_driver());
        let err = dispatcher
            .run_command(&DeviceId::new("ghost"), "setBrightness", json!({"level": 50}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn should_return_not_found_when_device_does_not_list_command() {
        let (dispatcher, _) = setup(lamp_driver());
        let err = dispatcher
            .run_command(&DeviceId::new("dev1"), "selfDestruct", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn should_report_driver_fault_when_listed_command_has_no_schema() {
        let (dispatcher, _) = setup(lamp_driver());
        let err = dispatcher
            .run_command(&DeviceId::new("dev1"), "reboot", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Driver);
        assert_eq!(err.driver_id().map(DriverId::as_str), Some("stub"));
    }

    #[tokio::test]
    async fn should_classify_handler_failure_as_connection() {
        let (dispatcher, _) = setup(lamp_driver().failing_commands());
        let err = dispatcher
            .run_command(&DeviceId::new("dev1"), "setBrightness", json!({"level": 10}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(err.driver_id().map(DriverId::as_str), Some("stub"));
    }

    #[test]
    fn should_keep_contract_faults_when_classifying_handler_errors() {
        let err: HomeboxError =
            homebox_domain::error::DriverError::untagged(DriverFault::Failed("bug".into())).into();
        assert_eq!(as_connection_fault(err).kind(), ErrorKind::Driver);

        let err: HomeboxError = NotFoundError::new("Bulb", "b1").into();
        assert_eq!(as_connection_fault(err).kind(), ErrorKind::Connection);
    }
}
