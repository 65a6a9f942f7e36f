//! `SQLite` implementation of [`EventStore`].
//!
//! Timestamps are stored as microseconds since the epoch so ordering happens
//! in SQL; `seq` (the rowid) breaks ties in insertion order.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use homebox_app::ports::EventStore;
use homebox_domain::error::HomeboxError;
use homebox_domain::event::Event;
use homebox_domain::id::{DeviceId, DriverId, EventId};
use homebox_domain::time::{Timestamp, from_micros, to_micros};

use crate::error::StorageError;

struct Wrapper(Event);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let event_type: String = row.try_get("event_type")?;
        let device_id: String = row.try_get("device_id")?;
        let driver: String = row.try_get("driver")?;
        let timestamp: i64 = row.try_get("timestamp_micros")?;
        let payload: String = row.try_get("payload")?;

        let payload: serde_json::Value =
            serde_json::from_str(&payload).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Event {
            id: EventId::from_uuid(id),
            event_type,
            device_id: DeviceId::new(device_id),
            driver: DriverId::new(driver),
            timestamp: from_micros(timestamp),
            payload,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO events (id, event_type, device_id, driver, timestamp_micros, payload)
    VALUES (?, ?, ?, ?, ?, ?)
";

const SELECT_LATEST_PER_TYPE: &str = r"
    SELECT e.* FROM events e
    WHERE e.seq = (
        SELECT i.seq FROM events i
        WHERE i.event_type = e.event_type
        ORDER BY i.timestamp_micros DESC, i.seq DESC
        LIMIT 1
    )
    ORDER BY e.event_type
";

const SELECT_BY_TYPE_SINCE: &str = r"
    SELECT * FROM events
    WHERE event_type = ? AND timestamp_micros >= ?
    ORDER BY timestamp_micros ASC, seq ASC
";

/// `SQLite`-backed event store.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Create a new event store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EventStore for SqliteEventStore {
    async fn append(&self, event: Event) -> Result<Event, HomeboxError> {
        let payload = serde_json::to_string(&event.payload).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(event.id.as_uuid())
            .bind(&event.event_type)
            .bind(event.device_id.as_str())
            .bind(event.driver.as_str())
            .bind(to_micros(event.timestamp))
            .bind(&payload)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(event)
    }

    async fn latest_by_type(&self) -> Result<Vec<Event>, HomeboxError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_LATEST_PER_TYPE)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn find_by_type(
        &self,
        event_type: &str,
        since: Option<Timestamp>,
    ) -> Result<Vec<Event>, HomeboxError> {
        let since = since.map_or(i64::MIN, to_micros);
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_TYPE_SINCE)
            .bind(event_type)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use homebox_domain::event::EventDraft;

    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteEventStore {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteEventStore::new(db.pool().clone())
    }

    fn at(minute: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 10, 8, minute, 0).unwrap()
    }

    fn event(event_type: &str, level: i64, minute: u32) -> Event {
        Event::accept(
            DriverId::new("virtual"),
            EventDraft::new(event_type, DeviceId::new("lamp-1"), json!({ "level": level }))
                .at(at(minute)),
        )
    }

    fn levels(events: &[Event]) -> Vec<i64> {
        events
            .iter()
            .filter_map(|e| e.payload["level"].as_i64())
            .collect()
    }

    #[tokio::test]
    async fn should_round_trip_stored_event() {
        let store = setup().await;
        let original = event("brightness", 42, 0);
        store.append(original.clone()).await.unwrap();

        let found = store.find_by_type("brightness", None).await.unwrap();
        assert_eq!(found, vec![original]);
    }

    #[tokio::test]
    async fn should_return_events_since_in_ascending_order() {
        let store = setup().await;
        for (level, minute) in [(3, 30), (1, 10), (2, 20), (0, 5)] {
            store
                .append(event("brightness", level, minute))
                .await
                .unwrap();
        }
        store.append(event("power", 9, 40)).await.unwrap();

        let found = store
            .find_by_type("brightness", Some(at(10)))
            .await
            .unwrap();
        assert_eq!(levels(&found), vec![1, 2, 3]);

        let everything = store.find_by_type("brightness", None).await.unwrap();
        assert_eq!(levels(&everything), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn should_return_empty_list_for_unknown_type() {
        let store = setup().await;
        store.append(event("brightness", 1, 1)).await.unwrap();
        assert!(store.find_by_type("smoke", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_pick_latest_by_timestamp_not_insertion() {
        let store = setup().await;
        store.append(event("brightness", 80, 50)).await.unwrap();
        store.append(event("brightness", 10, 5)).await.unwrap();
        store.append(event("power", 1, 1)).await.unwrap();

        let latest = store.latest_by_type().await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].event_type, "brightness");
        assert_eq!(latest[0].payload["level"], 80);
        assert_eq!(latest[1].event_type, "power");
    }

    #[tokio::test]
    async fn should_break_timestamp_ties_by_insertion_order() {
        let store = setup().await;
        store.append(event("brightness", 1, 7)).await.unwrap();
        store.append(event("brightness", 2, 7)).await.unwrap();

        let latest = store.latest_by_type().await.unwrap();
        assert_eq!(latest[0].payload["level"], 2);

        let found = store.find_by_type("brightness", None).await.unwrap();
        assert_eq!(levels(&found), vec![1, 2]);
    }
}
