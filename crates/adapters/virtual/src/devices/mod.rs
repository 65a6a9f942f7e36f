//! Virtual device implementations: light and switch.
//!
//! Device ids are derived from the configured slugs so they remain stable
//! across restarts of the driver.

mod light;
mod switch;

pub use light::{LightState, VirtualLight};
pub use switch::VirtualSwitch;

use serde_json::Value;

use homebox_domain::device::Device;
use homebox_domain::error::HomeboxError;
use homebox_domain::event::EventDraft;
use homebox_domain::id::{DeviceId, DriverId};

/// Wrapper enum for the concrete virtual device types.
pub enum VirtualDevice {
    Light(VirtualLight),
    Switch(VirtualSwitch),
}

impl VirtualDevice {
    #[must_use]
    pub fn id(&self) -> &DeviceId {
        match self {
            Self::Light(d) => d.id(),
            Self::Switch(d) => d.id(),
        }
    }

    /// Create the [`Device`] descriptor for registration.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn describe(&self, driver: &DriverId) -> Result<Device, HomeboxError> {
        match self {
            Self::Light(d) => d.describe(driver),
            Self::Switch(d) => d.describe(driver),
        }
    }

    /// Apply a command, returning the events to emit.
    ///
    /// # Errors
    ///
    /// Returns a driver fault for a command the device does not support.
    pub fn handle_command(
        &self,
        command: &str,
        payload: Value,
    ) -> Result<Vec<EventDraft>, HomeboxError> {
        match self {
            Self::Light(d) => d.handle_command(command, payload),
            Self::Switch(d) => d.handle_command(command),
        }
    }
}
