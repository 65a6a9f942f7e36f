//! Device service: use-cases for the devices drivers own.

use std::sync::Arc;

use tokio::sync::Mutex;

use homebox_domain::device::Device;
use homebox_domain::driver::Capability;
use homebox_domain::error::{DriverFault, HomeboxError, NotFoundError};
use homebox_domain::id::{DeviceId, DriverId};

use crate::ports::DeviceRepository;
use crate::registry::{DriverRegistry, contract_fault};

/// Application service for device queries, discovery and removal.
pub struct DeviceService<R> {
    repo: R,
    registry: Arc<DriverRegistry>,
    /// Held across the ownership check and the write of an upsert.
    upserts: Mutex<()>,
}

impl<R: DeviceRepository> DeviceService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R, registry: Arc<DriverRegistry>) -> Self {
        Self {
            repo,
            registry,
            upserts: Mutex::new(()),
        }
    }

    /// Look up a device by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::NotFound`] when no device with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_device(&self, id: &DeviceId) -> Result<Device, HomeboxError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| NotFoundError::new("Device", id).into())
    }

    /// List all devices.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_devices(&self) -> Result<Vec<Device>, HomeboxError> {
        self.repo.get_all().await
    }

    /// List devices of one type. An unknown type yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_by_type(&self, device_type: &str) -> Result<Vec<Device>, HomeboxError> {
        self.repo.find_by_type(device_type).await
    }

    /// List the devices owned by a loaded driver.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::NotFound`] if the driver is not loaded, or a
    /// storage error.
    pub async fn list_by_driver(&self, driver: &DriverId) -> Result<Vec<Device>, HomeboxError> {
        self.registry.get(driver)?;
        self.repo.find_by_driver(driver).await
    }

    /// Register or refresh a device on behalf of `driver`.
    ///
    /// Ownership is forced to `driver`. An existing device keeps its
    /// `created_at`. A device currently owned by another driver is not
    /// taken over.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::Driver`] if the device breaks domain
    /// invariants or belongs to another driver, or a storage error.
    #[tracing::instrument(skip(self, device), fields(device_id = %device.id))]
    pub async fn upsert_device(
        &self,
        driver: &DriverId,
        mut device: Device,
    ) -> Result<Device, HomeboxError> {
        device.driver = driver.clone();
        if let Err(err) = device.validate() {
            return Err(contract_fault(
                driver,
                DriverFault::InvalidDevice {
                    device: device.id.to_string(),
                    reason: err.to_string(),
                },
            ));
        }

        let _guard = self.upserts.lock().await;
        if let Some(existing) = self.repo.get_by_id(&device.id).await? {
            if existing.driver != *driver {
                return Err(contract_fault(
                    driver,
                    DriverFault::InvalidDevice {
                        device: device.id.to_string(),
                        reason: format!("already owned by driver {}", existing.driver),
                    },
                ));
            }
            device.created_at = existing.created_at;
        }

        self.repo.upsert(device).await
    }

    /// Ask `driver` to discover devices and register what it finds.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::NotFound`] if the driver is unknown or does
    /// not support discovery, a driver fault for malformed devices, or the
    /// driver's own error.
    #[tracing::instrument(skip(self))]
    pub async fn discover(&self, driver: &DriverId) -> Result<Vec<Device>, HomeboxError> {
        let handle = self.registry.require(driver, Capability::Discovery)?;
        let found = handle
            .call(|driver| async move { driver.discover().await })
            .await?;

        let mut registered = Vec::with_capacity(found.len());
        for device in found {
            registered.push(self.upsert_device(handle.id(), device).await?);
        }
        tracing::info!(driver = %handle.id(), count = registered.len(), "discovery finished");
        Ok(registered)
    }

    /// Remove a device: the owning driver forgets it first, then the hub.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::NotFound`] for an unknown device or a device
    /// whose driver is not loaded, or the driver's error (the device is then
    /// kept).
    #[tracing::instrument(skip(self))]
    pub async fn remove_device(&self, id: &DeviceId) -> Result<(), HomeboxError> {
        let device = self.get_device(id).await?;
        let handle = self.registry.get(&device.driver)?;

        let target = device.clone();
        handle
            .call(move |driver| async move { driver.remove_device(&target).await })
            .await?;

        self.repo.delete(&device.id).await?;
        tracing::info!(driver = %handle.id(), device_id = %device.id, "device removed");
        Ok(())
    }

    /// What the owning driver tells users to do when removal failed.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::NotFound`] for an unknown device or driver,
    /// or the driver's error.
    pub async fn failed_removal_instructions(
        &self,
        id: &DeviceId,
    ) -> Result<Option<String>, HomeboxError> {
        let device = self.get_device(id).await?;
        let handle = self.registry.get(&device.driver)?;
        handle
            .call(move |driver| async move { driver.failed_removal_instructions(&device).await })
            .await
    }
}
