//! Virtual switch: responds to `turnOn`, `turnOff`, `toggle`.

use std::sync::{Mutex, PoisonError};

use serde_json::json;

use homebox_domain::device::Device;
use homebox_domain::error::{DriverError, DriverFault, HomeboxError};
use homebox_domain::event::EventDraft;
use homebox_domain::id::{DeviceId, DriverId};

/// A simulated switch that can be turned on and off.
pub struct VirtualSwitch {
    id: DeviceId,
    label: String,
    on: Mutex<bool>,
}

impl VirtualSwitch {
    /// A switch with id `switch-{slug}`.
    #[must_use]
    pub fn new(slug: &str) -> Self {
        Self {
            id: DeviceId::new(format!("switch-{slug}")),
            label: slug.replace(['-', '_'], " "),
            on: Mutex::new(false),
        }
    }

    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Produce the [`Device`] descriptor.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn describe(&self, driver: &DriverId) -> Result<Device, HomeboxError> {
        Device::builder()
            .id(self.id.as_str())
            .driver(driver.clone())
            .name(format!("Virtual Switch ({})", self.label))
            .device_type("switch")
            .command("turnOn")
            .command("turnOff")
            .command("toggle")
            .event("power")
            .build()
    }

    /// Apply a command, returning a `power` event when the state flipped.
    ///
    /// # Errors
    ///
    /// Returns a driver fault for an unsupported command.
    pub fn handle_command(&self, command: &str) -> Result<Vec<EventDraft>, HomeboxError> {
        let mut on = self.on.lock().unwrap_or_else(PoisonError::into_inner);
        let before = *on;
        *on = match command {
            "turnOn" => true,
            "turnOff" => false,
            "toggle" => !before,
            other => {
                return Err(DriverError::untagged(DriverFault::Failed(format!(
                    "switch does not support `{other}`"
                )))
                .into());
            }
        };

        if *on == before {
            return Ok(Vec::new());
        }
        Ok(vec![EventDraft::new(
            "power",
            self.id.clone(),
            json!({ "on": *on }),
        )])
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        *self.on.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
