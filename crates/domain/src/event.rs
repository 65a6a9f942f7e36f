//! Event: an immutable record of something a device reported.
//!
//! Drivers hand the hub an [`EventDraft`]; once it has been checked against
//! the driver's [`EventDescription`] it is stamped with an id and becomes an
//! [`Event`]. Accepted events are never modified.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{DeviceId, DriverId, EventId};
use crate::schema::Schema;
use crate::time::{Timestamp, now};

/// An accepted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: String,
    pub device_id: DeviceId,
    /// The driver that emitted the event.
    pub driver: DriverId,
    pub timestamp: Timestamp,
    pub payload: Value,
}

impl Event {
    /// Stamp a draft emitted by `driver`. A draft without a timestamp is
    /// dated now.
    #[must_use]
    pub fn accept(driver: DriverId, draft: EventDraft) -> Self {
        Self {
            id: EventId::new(),
            event_type: draft.event_type,
            device_id: draft.device_id,
            driver,
            timestamp: draft.timestamp.unwrap_or_else(now),
            payload: draft.payload,
        }
    }
}

/// An event as emitted by a driver, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    #[serde(rename = "type")]
    pub event_type: String,
    pub device_id: DeviceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    pub payload: Value,
}

impl EventDraft {
    pub fn new(event_type: impl Into<String>, device_id: DeviceId, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            device_id,
            timestamp: None,
            payload,
        }
    }

    #[must_use]
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Event types the HTTP surface routes as paths of their own.
pub const RESERVED_EVENT_TYPES: &[&str] = &["latestCommands", "stream"];

/// An event type a driver declares, with the schema its payload must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescription {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Schema,
}

impl EventDescription {
    pub fn new(event_type: impl Into<String>, schema: impl Into<Schema>) -> Self {
        Self {
            event_type: event_type.into(),
            description: None,
            schema: schema.into(),
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn is_reserved(&self) -> bool {
        RESERVED_EVENT_TYPES.contains(&self.event_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    #[test]
    fn should_keep_draft_timestamp_when_accepting() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let draft = EventDraft::new("brightness", DeviceId::new("lamp-1"), json!({"level": 10}))
            .at(ts);
        let event = Event::accept(DriverId::new("virtual"), draft);
        assert_eq!(event.timestamp, ts);
        assert_eq!(event.driver.as_str(), "virtual");
        assert_eq!(event.event_type, "brightness");
    }

    #[test]
    fn should_date_draft_now_when_timestamp_missing() {
        let before = now();
        let draft = EventDraft::new("power", DeviceId::new("lamp-1"), json!({"on": true}));
        let event = Event::accept(DriverId::new("virtual"), draft);
        assert!(event.timestamp >= before);
    }

    #[test]
    fn should_flag_reserved_event_types() {
        assert!(EventDescription::new("stream", Schema::object()).is_reserved());
        assert!(EventDescription::new("latestCommands", Schema::object()).is_reserved());
        assert!(!EventDescription::new("power", Schema::object()).is_reserved());
    }

    #[test]
    fn should_serialize_event_type_as_type() {
        let draft = EventDraft::new("power", DeviceId::new("lamp-1"), json!({"on": true}));
        let event = Event::accept(DriverId::new("virtual"), draft);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "power");
        assert_eq!(json["device_id"], "lamp-1");
        assert_eq!(json["payload"]["on"], true);
    }
}
