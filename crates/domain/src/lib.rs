//! # homebox-domain
//!
//! Pure domain model for the homebox driver runtime.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error classification, timestamps
//! - The **schema** model and its validator, used at every boundary crossing
//! - Driver **capabilities** and introspection records
//! - **Authentication** steps, processes, results and the step-type catalog
//! - **Devices**, **commands** and **events** as the hub sees them
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod authentication;
pub mod command;
pub mod device;
pub mod driver;
pub mod event;
pub mod schema;
