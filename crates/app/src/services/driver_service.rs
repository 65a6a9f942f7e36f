//! Driver service: introspection over the loaded drivers.

use std::collections::BTreeMap;
use std::sync::Arc;

use homebox_domain::command::CommandDescription;
use homebox_domain::driver::{Capability, DriverSummary};
use homebox_domain::error::HomeboxError;
use homebox_domain::event::EventDescription;
use homebox_domain::id::DriverId;

use crate::ports::DeviceRepository;
use crate::registry::DriverRegistry;

pub struct DriverService<R> {
    devices: R,
    registry: Arc<DriverRegistry>,
}

impl<R: DeviceRepository> DriverService<R> {
    pub fn new(devices: R, registry: Arc<DriverRegistry>) -> Self {
        Self { devices, registry }
    }

    /// One summary per enabled driver, in id order.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_drivers(&self) -> Result<Vec<DriverSummary>, HomeboxError> {
        let mut summaries = Vec::new();
        for handle in self.registry.iter() {
            let devices = self.devices.find_by_driver(handle.id()).await?.len();
            summaries.push(DriverSummary {
                id: handle.id().clone(),
                capabilities: handle.capabilities(),
                devices,
            });
        }
        Ok(summaries)
    }

    /// Declared commands of every driver with the commands capability.
    ///
    /// # Errors
    ///
    /// Returns the first driver error encountered.
    pub async fn commands(
        &self,
    ) -> Result<BTreeMap<DriverId, Vec<CommandDescription>>, HomeboxError> {
        let mut all = BTreeMap::new();
        for handle in self.registry.with_capability(Capability::Commands) {
            let declared = handle
                .call(|driver| async move { driver.commands().await })
                .await?;
            all.insert(handle.id().clone(), declared);
        }
        Ok(all)
    }

    /// Declared event types of every driver with the events capability.
    ///
    /// # Errors
    ///
    /// Returns the first driver error encountered.
    pub async fn events(&self) -> Result<BTreeMap<DriverId, Vec<EventDescription>>, HomeboxError> {
        let mut all = BTreeMap::new();
        for handle in self.registry.with_capability(Capability::Events) {
            let declared = handle
                .call(|driver| async move { driver.events().await })
                .await?;
            all.insert(handle.id().clone(), declared);
        }
        Ok(all)
    }

    /// How to put a device of this driver in pairing mode.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::NotFound`] if the driver is not loaded, or
    /// the driver's error.
    pub async fn pairing_instructions(
        &self,
        driver: &DriverId,
    ) -> Result<Option<String>, HomeboxError> {
        let handle = self.registry.get(driver)?;
        handle
            .call(|driver| async move { driver.pairing_instructions().await })
            .await
    }
}
