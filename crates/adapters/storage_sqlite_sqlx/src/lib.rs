//! # homebox-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `DeviceRepository` and `EventStore` ports of `homebox-app`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `homebox-app` (for port traits) and `homebox-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod device_repo;
pub mod error;
pub mod event_store;
pub mod pool;

pub use device_repo::SqliteDeviceRepository;
pub use event_store::SqliteEventStore;
pub use pool::{Config, Database};
