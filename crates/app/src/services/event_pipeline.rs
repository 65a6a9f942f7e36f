//! Event pipeline: validates driver-emitted events, appends them to the
//! store and fans them out to live subscribers.

use std::collections::BTreeMap;
use std::sync::Arc;

use homebox_domain::driver::Capability;
use homebox_domain::error::{DriverFault, HomeboxError};
use homebox_domain::event::{Event, EventDraft};
use homebox_domain::id::DriverId;
use homebox_domain::schema::validate;
use homebox_domain::time::Timestamp;

use crate::ports::{EventPublisher, EventStore};
use crate::registry::{DriverRegistry, contract_fault};

/// Ingestion and queries over accepted events.
pub struct EventPipeline<S, P> {
    store: S,
    publisher: P,
    registry: Arc<DriverRegistry>,
}

impl<S, P> EventPipeline<S, P>
where
    S: EventStore,
    P: EventPublisher,
{
    pub fn new(store: S, publisher: P, registry: Arc<DriverRegistry>) -> Self {
        Self {
            store,
            publisher,
            registry,
        }
    }

    /// Accept an event emitted by `driver`.
    ///
    /// # Errors
    ///
    /// - [`HomeboxError::Driver`] if the driver is not loaded with the events
    ///   capability, does not declare `draft.event_type`, or the payload does
    ///   not match the declared schema. Nothing is stored.
    /// - A storage or publishing error.
    #[tracing::instrument(
        skip(self, draft),
        fields(event_type = %draft.event_type, device_id = %draft.device_id)
    )]
    pub async fn ingest(
        &self,
        driver: &DriverId,
        draft: EventDraft,
    ) -> Result<Event, HomeboxError> {
        let handle = self
            .registry
            .require(driver, Capability::Events)
            .map_err(|_| {
                contract_fault(
                    driver,
                    DriverFault::CapabilityNotImplemented(Capability::Events),
                )
            })?;

        let declared = handle
            .call(|driver| async move { driver.events().await })
            .await?;
        let description = declared
            .iter()
            .find(|description| description.event_type == draft.event_type)
            .ok_or_else(|| {
                contract_fault(
                    driver,
                    DriverFault::MissingSchema {
                        kind: "event",
                        name: draft.event_type.clone(),
                    },
                )
            })?;

        validate(&draft.payload, &description.schema)
            .map_err(|err| contract_fault(driver, err.into()))?
            .into_result()
            .map_err(|errors| {
                contract_fault(
                    driver,
                    DriverFault::InvalidEvent {
                        event_type: draft.event_type.clone(),
                        errors,
                    },
                )
            })?;

        let event = self
            .store
            .append(Event::accept(driver.clone(), draft))
            .await?;
        self.publisher.publish(event.clone()).await?;
        tracing::debug!(event_id = %event.id, "event accepted");
        Ok(event)
    }

    /// The most recent event of every type, keyed by type.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn latest_by_command(&self) -> Result<BTreeMap<String, Event>, HomeboxError> {
        let latest = self.store.latest_by_type().await?;
        Ok(latest
            .into_iter()
            .map(|event| (event.event_type.clone(), event))
            .collect())
    }

    /// Events of `event_type` at or after `since`, oldest first. An unknown
    /// type yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn by_type(
        &self,
        event_type: &str,
        since: Option<Timestamp>,
    ) -> Result<Vec<Event>, HomeboxError> {
        self.store.find_by_type(event_type, since).await
    }
}
