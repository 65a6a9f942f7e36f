//! Server-Sent Events (SSE) stream of accepted events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use homebox_app::ports::{DeviceRepository, EventPublisher, EventStore};

use crate::state::AppState;

/// `GET /event/stream`: SSE stream of events as they are accepted.
///
/// Each frame carries the event's `type` as SSE event name, its id, and the
/// JSON-encoded event as `data`. The stream continues until the client
/// disconnects or the event bus is closed. Slow clients skip the events
/// they missed.
pub async fn stream<R, S, P>(
    State(state): State<AppState<R, S, P>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    R: DeviceRepository + Send + Sync + 'static,
    S: EventStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match Event::default()
            .event(event.event_type.clone())
            .id(event.id.to_string())
            .json_data(&event)
        {
            Ok(frame) => Some(Ok(frame)),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize event for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "SSE subscriber lagged, some events were dropped");
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
