//! Shared application state for axum handlers.

use std::sync::Arc;

use homebox_app::event_bus::InProcessEventBus;
use homebox_app::ports::{DeviceRepository, EventPublisher, EventStore};
use homebox_app::registry::DriverRegistry;
use homebox_app::services::authentication::AuthenticationEngine;
use homebox_app::services::command_dispatcher::CommandDispatcher;
use homebox_app::services::device_service::DeviceService;
use homebox_app::services::driver_service::DriverService;
use homebox_app::services::event_pipeline::EventPipeline;

/// Application state shared across all axum handlers.
///
/// Generic over the device repository, event store and event publisher to
/// avoid dynamic dispatch. `Clone` is implemented manually so the underlying
/// types themselves do not need to be `Clone`; only the `Arc` wrappers are
/// cloned.
pub struct AppState<R, S, P> {
    /// Pairing flows.
    pub authentication: Arc<AuthenticationEngine>,
    /// Device queries, discovery and removal.
    pub devices: Arc<DeviceService<R>>,
    /// Driver introspection.
    pub drivers: Arc<DriverService<R>>,
    pub commands: Arc<CommandDispatcher<R>>,
    /// Event ingestion and queries.
    pub events: Arc<EventPipeline<S, P>>,
    /// Live feed for the SSE endpoint.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<R, S, P> Clone for AppState<R, S, P> {
    fn clone(&self) -> Self {
        Self {
            authentication: Arc::clone(&self.authentication),
            devices: Arc::clone(&self.devices),
            drivers: Arc::clone(&self.drivers),
            commands: Arc::clone(&self.commands),
            events: Arc::clone(&self.events),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<R, S, P> AppState<R, S, P>
where
    R: DeviceRepository + Clone + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    /// Build every service around one registry and one device repository.
    ///
    /// `events` is taken pre-wrapped because drivers share it through their
    /// contexts.
    pub fn new(
        registry: Arc<DriverRegistry>,
        device_repo: R,
        events: Arc<EventPipeline<S, P>>,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        Self {
            authentication: Arc::new(AuthenticationEngine::new(Arc::clone(&registry))),
            devices: Arc::new(DeviceService::new(
                device_repo.clone(),
                Arc::clone(&registry),
            )),
            drivers: Arc::new(DriverService::new(
                device_repo.clone(),
                Arc::clone(&registry),
            )),
            commands: Arc::new(CommandDispatcher::new(device_repo, registry)),
            events,
            event_bus,
        }
    }
}
