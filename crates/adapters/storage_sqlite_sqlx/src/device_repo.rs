//! `SQLite` implementation of [`DeviceRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use homebox_app::ports::DeviceRepository;
use homebox_domain::device::Device;
use homebox_domain::error::HomeboxError;
use homebox_domain::id::{DeviceId, DriverId};
use homebox_domain::time::{from_micros, to_micros};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Device`].
struct Wrapper(Device);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Device> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let driver: String = row.try_get("driver")?;
        let name: String = row.try_get("name")?;
        let device_type: String = row.try_get("device_type")?;
        let commands: String = row.try_get("commands")?;
        let events: String = row.try_get("events")?;
        let created_at: i64 = row.try_get("created_at")?;

        let commands: Vec<String> =
            serde_json::from_str(&commands).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let events: Vec<String> =
            serde_json::from_str(&events).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Device {
            id: DeviceId::new(id),
            driver: DriverId::new(driver),
            name,
            device_type,
            commands,
            events,
            created_at: from_micros(created_at),
        }))
    }
}

const UPSERT: &str = r"
    INSERT INTO devices (id, driver, name, device_type, commands, events, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (id) DO UPDATE SET
        driver = excluded.driver,
        name = excluded.name,
        device_type = excluded.device_type,
        commands = excluded.commands,
        events = excluded.events,
        created_at = excluded.created_at
";
const SELECT_BY_ID: &str = "SELECT * FROM devices WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM devices ORDER BY id";
const SELECT_BY_TYPE: &str = "SELECT * FROM devices WHERE device_type = ? ORDER BY id";
const SELECT_BY_DRIVER: &str = "SELECT * FROM devices WHERE driver = ? ORDER BY id";
const DELETE_BY_ID: &str = "DELETE FROM devices WHERE id = ?";

/// `SQLite`-backed device repository.
#[derive(Clone)]
pub struct SqliteDeviceRepository {
    pool: SqlitePool,
}

impl SqliteDeviceRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, query: &str, value: &str) -> Result<Vec<Device>, HomeboxError> {
        let rows: Vec<Wrapper> = sqlx::query_as(query)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

impl DeviceRepository for SqliteDeviceRepository {
    async fn upsert(&self, device: Device) -> Result<Device, HomeboxError> {
        let commands = serde_json::to_string(&device.commands).map_err(StorageError::from)?;
        let events = serde_json::to_string(&device.events).map_err(StorageError::from)?;

        sqlx::query(UPSERT)
            .bind(device.id.as_str())
            .bind(device.driver.as_str())
            .bind(&device.name)
            .bind(&device.device_type)
            .bind(&commands)
            .bind(&events)
            .bind(to_micros(device.created_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(device)
    }

    async fn get_by_id(&self, id: &DeviceId) -> Result<Option<Device>, HomeboxError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn get_all(&self) -> Result<Vec<Device>, HomeboxError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn find_by_type(&self, device_type: &str) -> Result<Vec<Device>, HomeboxError> {
        self.fetch_where(SELECT_BY_TYPE, device_type).await
    }

    async fn find_by_driver(&self, driver: &DriverId) -> Result<Vec<Device>, HomeboxError> {
        self.fetch_where(SELECT_BY_DRIVER, driver.as_str()).await
    }

    async fn delete(&self, id: &DeviceId) -> Result<(), HomeboxError> {
        sqlx::query(DELETE_BY_ID)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}
