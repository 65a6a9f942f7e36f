//! Storage port: repository traits for persistence.

use std::future::Future;

use homebox_domain::device::Device;
use homebox_domain::error::HomeboxError;
use homebox_domain::id::{DeviceId, DriverId};

/// Repository for [`Device`]s, keyed by [`DeviceId`].
pub trait DeviceRepository {
    /// Insert `device`, or replace the stored device with the same id.
    fn upsert(&self, device: Device) -> impl Future<Output = Result<Device, HomeboxError>> + Send;

    fn get_by_id(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, HomeboxError>> + Send;

    /// All devices, ordered by id.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, HomeboxError>> + Send;

    fn find_by_type(
        &self,
        device_type: &str,
    ) -> impl Future<Output = Result<Vec<Device>, HomeboxError>> + Send;

    fn find_by_driver(
        &self,
        driver: &DriverId,
    ) -> impl Future<Output = Result<Vec<Device>, HomeboxError>> + Send;

    /// Delete a device. Deleting an unknown id is not an error.
    fn delete(&self, id: &DeviceId) -> impl Future<Output = Result<(), HomeboxError>> + Send;
}

impl<T: DeviceRepository + Send + Sync> DeviceRepository for std::sync::Arc<T> {
    fn upsert(&self, device: Device) -> impl Future<Output = Result<Device, HomeboxError>> + Send {
        (**self).upsert(device)
    }

    fn get_by_id(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, HomeboxError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, HomeboxError>> + Send {
        (**self).get_all()
    }

    fn find_by_type(
        &self,
        device_type: &str,
    ) -> impl Future<Output = Result<Vec<Device>, HomeboxError>> + Send {
        (**self).find_by_type(device_type)
    }

    fn find_by_driver(
        &self,
        driver: &DriverId,
    ) -> impl Future<Output = Result<Vec<Device>, HomeboxError>> + Send {
        (**self).find_by_driver(driver)
    }

    fn delete(&self, id: &DeviceId) -> impl Future<Output = Result<(), HomeboxError>> + Send {
        (**self).delete(id)
    }
}
