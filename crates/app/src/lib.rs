//! # homebox-app
//!
//! Application layer: the driver runtime, use-cases and **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `Driver`: the capability contract of a device ecosystem plugin
//!   - `DriverContext`: the channel a driver reports devices and events on
//!   - `DeviceRepository`: persistence for devices
//!   - `EventStore`: append & query accepted events
//!   - `EventPublisher`: live fan-out of accepted events
//! - Hold loaded drivers in the `DriverRegistry`
//! - Provide the use-cases:
//!   - `AuthenticationEngine`: generic multi-step pairing
//!   - `CommandDispatcher`: validated command routing
//!   - `EventPipeline`: validated event ingestion and queries
//!   - `DeviceService`, `DriverService`: devices and introspection
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `homebox-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod ports;
pub mod registry;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
