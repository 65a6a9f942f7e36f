//! # homebox-adapter-virtual
//!
//! Virtual/demo driver that provides simulated devices for testing and
//! demonstration purposes. It implements every capability of the driver
//! contract.
//!
//! ## Provided devices
//!
//! | Device | Id | Commands | Events |
//! |--------|----|----------|--------|
//! | Virtual Light | `light-{slug}` | `turnOn`, `turnOff`, `setBrightness` | `power`, `brightness` |
//! | Virtual Switch | `switch-{slug}` | `turnOn`, `turnOff`, `toggle` | `power` |
//!
//! ## Pairing
//!
//! Two steps: `apiKey` (any key, or the configured `api_key`) then
//! `confirm`.
//!
//! ## Settings
//!
//! ```toml
//! [drivers.settings.virtual]
//! api_key = "s3cret"
//! lights = ["desk", "ceiling"]
//! switches = ["fan"]
//! ```
//!
//! ## Dependency rule
//!
//! Depends on `homebox-app` (port traits) and `homebox-domain` only.

mod devices;
mod pairing;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use homebox_app::ports::{Driver, DriverContext};
use homebox_domain::authentication::{AuthenticationStep, AuthenticationStepResult};
use homebox_domain::command::CommandDescription;
use homebox_domain::device::Device;
use homebox_domain::driver::Capabilities;
use homebox_domain::error::{ConnectionError, DriverError, DriverFault, HomeboxError};
use homebox_domain::event::EventDescription;
use homebox_domain::id::{DeviceId, DriverId};
use homebox_domain::schema::Schema;

pub use devices::{LightState, VirtualDevice, VirtualLight, VirtualSwitch};
pub use pairing::Pairing;

/// Id the virtual driver is registered under.
pub const DRIVER_ID: &str = "virtual";

/// Settings accepted by [`factory`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VirtualSettings {
    /// Only this key pairs when set.
    pub api_key: Option<String>,
    /// Slugs of the lights to simulate.
    pub lights: Vec<String>,
    /// Slugs of the switches to simulate.
    pub switches: Vec<String>,
}

impl Default for VirtualSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            lights: vec!["desk".to_string()],
            switches: vec!["fan".to_string()],
        }
    }
}

/// Driver factory for the catalog.
///
/// # Errors
///
/// Returns a driver fault when `settings` does not describe
/// [`VirtualSettings`] or names an empty slug.
pub fn factory(settings: &Value) -> Result<Arc<dyn Driver>, HomeboxError> {
    let settings: VirtualSettings = serde_json::from_value(settings.clone())
        .map_err(|err| failed(format!("invalid settings: {err}")))?;
    Ok(Arc::new(VirtualDriver::new(settings)?))
}

/// Simulated bridge exposing lights and switches.
pub struct VirtualDriver {
    driver_id: DriverId,
    devices: Mutex<BTreeMap<DeviceId, Arc<VirtualDevice>>>,
    pairing: Pairing,
    ctx: Mutex<Option<Arc<dyn DriverContext>>>,
}

impl VirtualDriver {
    /// # Errors
    ///
    /// Returns a driver fault if a slug is empty.
    pub fn new(settings: VirtualSettings) -> Result<Self, HomeboxError> {
        if settings
            .lights
            .iter()
            .chain(&settings.switches)
            .any(|slug| slug.trim().is_empty())
        {
            return Err(failed("device slugs must not be empty"));
        }

        let devices = settings
            .lights
            .iter()
            .map(|slug| VirtualDevice::Light(VirtualLight::new(slug)))
            .chain(
                settings
                    .switches
                    .iter()
                    .map(|slug| VirtualDevice::Switch(VirtualSwitch::new(slug))),
            )
            .map(|device| (device.id().clone(), Arc::new(device)))
            .collect();

        Ok(Self {
            driver_id: DriverId::new(DRIVER_ID),
            devices: Mutex::new(devices),
            pairing: Pairing::new(settings.api_key),
            ctx: Mutex::new(None),
        })
    }

    /// The key the bridge was paired with.
    #[must_use]
    pub fn paired_key(&self) -> Option<String> {
        self.pairing.paired_key()
    }

    fn device(&self, id: &DeviceId) -> Option<Arc<VirtualDevice>> {
        self.lock_devices().get(id).cloned()
    }

    fn descriptors(&self) -> Result<Vec<Device>, HomeboxError> {
        self.lock_devices()
            .values()
            .map(|device| device.describe(&self.driver_id))
            .collect()
    }

    fn context(&self) -> Option<Arc<dyn DriverContext>> {
        self.ctx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn lock_devices(&self) -> std::sync::MutexGuard<'_, BTreeMap<DeviceId, Arc<VirtualDevice>>> {
        self.devices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Driver for VirtualDriver {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn init(&self, ctx: Arc<dyn DriverContext>) -> Result<(), HomeboxError> {
        for device in self.descriptors()? {
            ctx.upsert_device(device).await?;
        }
        *self
            .ctx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(ctx);
        Ok(())
    }

    async fn teardown(&self) -> Result<(), HomeboxError> {
        self.ctx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<Device>, HomeboxError> {
        self.descriptors()
    }

    async fn pairing_instructions(&self) -> Result<Option<String>, HomeboxError> {
        Ok(Some(
            "Press the link button on the virtual bridge, then start pairing.".to_string(),
        ))
    }

    async fn failed_removal_instructions(
        &self,
        device: &Device,
    ) -> Result<Option<String>, HomeboxError> {
        Ok(Some(format!(
            "Reset {} by holding its button for ten seconds.",
            device.name
        )))
    }

    async fn remove_device(&self, device: &Device) -> Result<(), HomeboxError> {
        self.lock_devices().remove(&device.id);
        Ok(())
    }

    async fn authentication_process(&self) -> Result<Vec<AuthenticationStep>, HomeboxError> {
        Ok(Pairing::process())
    }

    async fn authentication_step(
        &self,
        index: usize,
        payload: Value,
    ) -> Result<AuthenticationStepResult, HomeboxError> {
        self.pairing.step(index, payload)
    }

    async fn commands(&self) -> Result<Vec<CommandDescription>, HomeboxError> {
        Ok(vec![
            CommandDescription::new("turnOn", Schema::object().deny_additional())
                .describe("Switch the device on"),
            CommandDescription::new("turnOff", Schema::object().deny_additional())
                .describe("Switch the device off"),
            CommandDescription::new("toggle", Schema::object().deny_additional())
                .describe("Flip the device's power state"),
            CommandDescription::new(
                "setBrightness",
                Schema::object()
                    .required_property("level", Schema::integer_range(0, 100))
                    .deny_additional(),
            )
            .describe("Dim a light; 0 switches it off"),
        ])
    }

    async fn run_command(
        &self,
        device: &Device,
        command: &str,
        payload: Value,
    ) -> Result<(), HomeboxError> {
        let target = self.device(&device.id).ok_or_else(|| {
            ConnectionError::new(format!("device {} is not reachable", device.id))
        })?;
        let events = target.handle_command(command, payload)?;

        if let Some(ctx) = self.context() {
            for event in events {
                ctx.emit(event).await?;
            }
        }
        Ok(())
    }

    async fn events(&self) -> Result<Vec<EventDescription>, HomeboxError> {
        Ok(vec![
            EventDescription::new(
                "power",
                Schema::object().required_property("on", Schema::boolean()),
            )
            .describe("Power state changed"),
            EventDescription::new(
                "brightness",
                Schema::object().required_property("level", Schema::integer_range(0, 100)),
            )
            .describe("Brightness changed"),
        ])
    }
}

fn failed(message: impl Into<String>) -> HomeboxError {
    DriverError::untagged(DriverFault::Failed(message.into())).into()
}
