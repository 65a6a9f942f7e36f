//! # homebox-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Map the hub's routes onto the driver runtime services
//!   (`/authenticate/{driver}`, `/device/{device_id}/{command}`,
//!   `/event/{event_type}`, …)
//! - Render every [`HomeboxError`](homebox_domain::error::HomeboxError) as a
//!   JSON body `{code, type, message, driver?, errors?}` with the matching
//!   status code
//! - Stream accepted events to browsers as Server-Sent Events
//!
//! ## Dependency rule
//! Depends on `homebox-app` (for port traits and services) and
//! `homebox-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
