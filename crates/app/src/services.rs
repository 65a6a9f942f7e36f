//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.
//! Services that talk to drivers share the process-wide
//! [`DriverRegistry`](crate::registry::DriverRegistry) through an `Arc`.

pub mod authentication;
pub mod command_dispatcher;
pub mod device_service;
pub mod driver_context;
pub mod driver_service;
pub mod event_pipeline;
pub mod pairing;
