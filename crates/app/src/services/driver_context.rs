//! Concrete [`DriverContext`] backed by application services.

use std::sync::Arc;

use async_trait::async_trait;

use homebox_domain::device::Device;
use homebox_domain::error::HomeboxError;
use homebox_domain::event::{Event, EventDraft};
use homebox_domain::id::DriverId;

use crate::ports::{DeviceRepository, DriverContext, EventPublisher, EventStore};
use crate::services::device_service::DeviceService;
use crate::services::event_pipeline::EventPipeline;

/// [`DriverContext`] implementation that delegates to `DeviceService` and
/// the `EventPipeline`, on behalf of one driver.
///
/// The generic parameters are confined to this struct: drivers see only
/// the [`DriverContext`] trait.
pub struct ServiceContext<R, S, P> {
    driver: DriverId,
    devices: Arc<DeviceService<R>>,
    events: Arc<EventPipeline<S, P>>,
}

impl<R, S, P> ServiceContext<R, S, P> {
    pub fn new(
        driver: DriverId,
        devices: Arc<DeviceService<R>>,
        events: Arc<EventPipeline<S, P>>,
    ) -> Self {
        Self {
            driver,
            devices,
            events,
        }
    }
}

impl<R, S, P> Clone for ServiceContext<R, S, P> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            devices: Arc::clone(&self.devices),
            events: Arc::clone(&self.events),
        }
    }
}

#[async_trait]
impl<R, S, P> DriverContext for ServiceContext<R, S, P>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    fn driver_id(&self) -> &DriverId {
        &self.driver
    }

    async fn upsert_device(&self, device: Device) -> Result<Device, HomeboxError> {
        self.devices.upsert_device(&self.driver, device).await
    }

    async fn emit(&self, event: EventDraft) -> Result<Event, HomeboxError> {
        self.events.ingest(&self.driver, event).await
    }
}
