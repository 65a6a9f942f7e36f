//! Event bus port: fan-out of accepted events to live subscribers.

use std::future::Future;

use homebox_domain::error::HomeboxError;
use homebox_domain::event::Event;

/// Publishes accepted events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HomeboxError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HomeboxError>> + Send {
        (**self).publish(event)
    }
}
