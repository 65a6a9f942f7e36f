//! Event store port: append-only persistence for accepted events.

use std::future::Future;

use homebox_domain::error::HomeboxError;
use homebox_domain::event::Event;
use homebox_domain::time::Timestamp;

/// Append-only store of accepted [`Event`]s.
///
/// Implementations must make every appended event visible atomically: a
/// reader never observes a partially written event.
pub trait EventStore {
    /// Persist a new event.
    fn append(&self, event: Event) -> impl Future<Output = Result<Event, HomeboxError>> + Send;

    /// The most recent event of every type, one per type.
    ///
    /// "Most recent" is the greatest timestamp; among equal timestamps the
    /// event appended last wins.
    fn latest_by_type(&self) -> impl Future<Output = Result<Vec<Event>, HomeboxError>> + Send;

    /// Events of `event_type` with `timestamp >= since` (all of them when
    /// `since` is `None`), ascending by timestamp then insertion order.
    fn find_by_type(
        &self,
        event_type: &str,
        since: Option<Timestamp>,
    ) -> impl Future<Output = Result<Vec<Event>, HomeboxError>> + Send;
}

impl<T: EventStore + Send + Sync> EventStore for std::sync::Arc<T> {
    fn append(&self, event: Event) -> impl Future<Output = Result<Event, HomeboxError>> + Send {
        (**self).append(event)
    }

    fn latest_by_type(&self) -> impl Future<Output = Result<Vec<Event>, HomeboxError>> + Send {
        (**self).latest_by_type()
    }

    fn find_by_type(
        &self,
        event_type: &str,
        since: Option<Timestamp>,
    ) -> impl Future<Output = Result<Vec<Event>, HomeboxError>> + Send {
        (**self).find_by_type(event_type, since)
    }
}
