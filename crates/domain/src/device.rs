//! Device: a physical or cloud-side thing owned by exactly one driver.
//!
//! The hub only needs `id → driver` resolution plus the names of the
//! commands and events a device supports; everything else about the device
//! lives inside its driver.

use serde::{Deserialize, Serialize};

use crate::error::{HomeboxError, ValidationError};
use crate::id::{DeviceId, DriverId};
use crate::time::{Timestamp, now};

/// A device registered with the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// The driver that owns this device.
    pub driver: DriverId,
    pub name: String,
    /// Free-form category used for grouping (`"light"`, `"thermostat"`, …).
    #[serde(rename = "type")]
    pub device_type: String,
    /// Names of the commands this device accepts.
    #[serde(default)]
    pub commands: Vec<String>,
    /// Names of the event types this device emits.
    #[serde(default)]
    pub events: Vec<String>,
    pub created_at: Timestamp,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::Validation`] when `id`, `driver`, `name` or
    /// `device_type` is empty.
    pub fn validate(&self) -> Result<(), HomeboxError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::Empty { field: "id" }.into());
        }
        if self.driver.as_str().trim().is_empty() {
            return Err(ValidationError::Empty { field: "driver" }.into());
        }
        if self.name.is_empty() {
            return Err(ValidationError::Empty { field: "name" }.into());
        }
        if self.device_type.is_empty() {
            return Err(ValidationError::Empty { field: "type" }.into());
        }
        Ok(())
    }

    #[must_use]
    pub fn supports_command(&self, command: &str) -> bool {
        self.commands.iter().any(|name| name == command)
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    driver: Option<DriverId>,
    name: Option<String>,
    device_type: Option<String>,
    commands: Vec<String>,
    events: Vec<String>,
    created_at: Option<Timestamp>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(DeviceId::new(id));
        self
    }

    #[must_use]
    pub fn driver(mut self, driver: DriverId) -> Self {
        self.driver = Some(driver);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    #[must_use]
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    #[must_use]
    pub fn event(mut self, event_type: impl Into<String>) -> Self {
        self.events.push(event_type.into());
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::Validation`] if a required field is missing
    /// or empty.
    pub fn build(self) -> Result<Device, HomeboxError> {
        let device = Device {
            id: self.id.unwrap_or_else(|| DeviceId::new("")),
            driver: self.driver.unwrap_or_else(|| DriverId::new("")),
            name: self.name.unwrap_or_default(),
            device_type: self.device_type.unwrap_or_default(),
            commands: self.commands,
            events: self.events,
            created_at: self.created_at.unwrap_or_else(now),
        };
        device.validate()?;
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp() -> DeviceBuilder {
        Device::builder()
            .id("lamp-1")
            .driver(DriverId::new("virtual"))
            .name("Desk Lamp")
            .device_type("light")
    }

    #[test]
    fn should_build_valid_device_when_all_fields_provided() {
        let device = lamp()
            .command("setBrightness")
            .event("brightness")
            .build()
            .unwrap();
        assert_eq!(device.id.as_str(), "lamp-1");
        assert!(device.supports_command("setBrightness"));
        assert!(!device.supports_command("turnOn"));
        assert_eq!(device.events, vec!["brightness".to_string()]);
    }

    #[test]
    fn should_return_validation_error_when_id_missing() {
        let result = Device::builder()
            .driver(DriverId::new("virtual"))
            .name("Desk Lamp")
            .device_type("light")
            .build();
        assert!(matches!(
            result,
            Err(HomeboxError::Validation(ValidationError::Empty { field: "id" }))
        ));
    }

    #[test]
    fn should_return_validation_error_when_type_missing() {
        let result = Device::builder()
            .id("lamp-1")
            .driver(DriverId::new("virtual"))
            .name("Desk Lamp")
            .build();
        assert!(matches!(
            result,
            Err(HomeboxError::Validation(ValidationError::Empty { field: "type" }))
        ));
    }

    #[test]
    fn should_serialize_device_type_as_type() {
        let device = lamp().build().unwrap();
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["type"], "light");
        assert_eq!(json["driver"], "virtual");
    }
}
