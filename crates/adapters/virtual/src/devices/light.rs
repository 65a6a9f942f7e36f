//! Virtual light: dimmable, responds to `turnOn`, `turnOff`, `setBrightness`.

use std::sync::Mutex;

use serde::Deserialize;
use serde_json::{Value, json};

use homebox_domain::device::Device;
use homebox_domain::error::{DriverError, DriverFault, HomeboxError};
use homebox_domain::event::EventDraft;
use homebox_domain::id::{DeviceId, DriverId};

/// Observable state of a [`VirtualLight`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    pub on: bool,
    /// 0–100.
    pub brightness: u8,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            on: false,
            brightness: 100,
        }
    }
}

#[derive(Deserialize)]
struct SetBrightness {
    level: u8,
}

/// A simulated dimmable light.
pub struct VirtualLight {
    id: DeviceId,
    label: String,
    state: Mutex<LightState>,
}

impl VirtualLight {
    /// A light with id `light-{slug}`.
    #[must_use]
    pub fn new(slug: &str) -> Self {
        Self {
            id: DeviceId::new(format!("light-{slug}")),
            label: slug.replace(['-', '_'], " "),
            state: Mutex::new(LightState::default()),
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
            .name(format!("Virtual Light ({})", self.label))
            .device_type("light")
            .command("turnOn")
            .command("turnOff")
            .command("setBrightness")
            .event("power")
            .event("brightness")
            .build()
    }

    /// Apply a command and return the events describing what changed.
    ///
    /// # Errors
    ///
    /// Returns a driver fault for an unsupported command or a payload that
    /// does not decode.
    pub fn handle_command(
        &self,
        command: &str,
        payload: Value,
    ) -> Result<Vec<EventDraft>, HomeboxError> {
        let mut state = self.lock_state_mut();
        let before = *state;
        match command {
            "turnOn" => state.on = true,
            "turnOff" => state.on = false,
            "setBrightness" => {
                let SetBrightness { level } = serde_json::from_value(payload).map_err(|err| {
                    DriverError::untagged(DriverFault::Failed(format!(
                        "setBrightness payload: {err}"
                    )))
                })?;
                state.brightness = level;
                state.on = level > 0;
            }
            other => {
                return Err(DriverError::untagged(DriverFault::Failed(format!(
                    "light does not support `{other}`"
                )))
                .into());
            }
        }

        let mut events = Vec::new();
        if state.brightness != before.brightness {
            events.push(EventDraft::new(
                "brightness",
                self.id.clone(),
                json!({ "level": state.brightness }),
            ));
        }
        if state.on != before.on {
            events.push(EventDraft::new(
                "power",
                self.id.clone(),
                json!({ "on": state.on }),
            ));
        }
        Ok(events)
    }

    #[must_use]
    pub fn state(&self) -> LightState {
        *self.lock_state_mut()
    }

    fn lock_state_mut(&self) -> std::sync::MutexGuard<'_, LightState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
