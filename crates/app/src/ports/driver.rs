//! Driver port: the capability contract every device ecosystem plugin
//! implements, and the channel it uses to talk back to the hub.
//!
//! A driver bridges one ecosystem (a lighting bridge, a media player cloud,
//! …) into homebox. The hub holds drivers as `Arc<dyn Driver>` in the
//! [`DriverRegistry`](crate::registry::DriverRegistry) and only ever invokes
//! a capability method after checking the driver declares it.
//!
//! Lifecycle, driven by the composition root:
//!
//! 1. a factory builds the driver from its settings,
//! 2. [`init`](Driver::init) hands it a [`DriverContext`],
//! 3. capability methods are called concurrently while the hub serves,
//! 4. [`teardown`](Driver::teardown) releases its resources.
//!
//! The hub never serializes calls into one driver: a driver whose state is
//! not safe under concurrent calls must guard it itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use homebox_domain::authentication::{
    AuthenticationSchemas, AuthenticationStep, AuthenticationStepResult,
};
use homebox_domain::command::CommandDescription;
use homebox_domain::device::Device;
use homebox_domain::driver::{Capabilities, Capability};
use homebox_domain::error::{DriverError, DriverFault, HomeboxError};
use homebox_domain::event::{Event, EventDescription, EventDraft};
use homebox_domain::id::DriverId;

/// Handle a driver receives in [`Driver::init`] to report devices and events.
#[async_trait]
pub trait DriverContext: Send + Sync {
    /// The id the driver was loaded under.
    fn driver_id(&self) -> &DriverId;

    /// Register or refresh a device. Ownership is forced to this driver.
    async fn upsert_device(&self, device: Device) -> Result<Device, HomeboxError>;

    /// Submit an event. It is validated against the driver's declared
    /// event schemas before it is stored and published.
    async fn emit(&self, event: EventDraft) -> Result<Event, HomeboxError>;
}

/// The capability contract.
///
/// Capability methods have defaults returning a
/// [`DriverFault::CapabilityNotImplemented`] fault; a driver overrides the
/// groups it lists in [`capabilities`](Driver::capabilities).
#[async_trait]
pub trait Driver: Send + Sync {
    /// The optional operation groups this driver implements.
    fn capabilities(&self) -> Capabilities;

    /// Called once after loading, before any capability call.
    async fn init(&self, _ctx: Arc<dyn DriverContext>) -> Result<(), HomeboxError> {
        Ok(())
    }

    /// Called once on shutdown.
    async fn teardown(&self) -> Result<(), HomeboxError> {
        Ok(())
    }

    // -- discovery ----------------------------------------------------------

    /// Look for devices reachable by this driver.
    async fn discover(&self) -> Result<Vec<Device>, HomeboxError> {
        Err(not_implemented(Capability::Discovery))
    }

    /// Human-readable instructions for putting a device in pairing mode.
    async fn pairing_instructions(&self) -> Result<Option<String>, HomeboxError> {
        Ok(None)
    }

    /// Instructions shown when removing `device` failed on the driver side.
    async fn failed_removal_instructions(
        &self,
        _device: &Device,
    ) -> Result<Option<String>, HomeboxError> {
        Ok(None)
    }

    /// Forget `device` on the driver side.
    async fn remove_device(&self, _device: &Device) -> Result<(), HomeboxError> {
        Ok(())
    }

    // -- authentication -----------------------------------------------------

    /// The ordered pairing steps. Step indices are positions in this list.
    async fn authentication_process(&self) -> Result<Vec<AuthenticationStep>, HomeboxError> {
        Err(not_implemented(Capability::Authentication))
    }

    /// Step types this driver defines on top of the built-in catalog.
    /// Entries here replace built-in ones with the same tag.
    async fn authentication_schemas(&self) -> Result<AuthenticationSchemas, HomeboxError> {
        Ok(AuthenticationSchemas::empty())
    }

    /// Handle the caller's answer to step `index`. `payload` has already been
    /// validated against the step's `returned` schema.
    async fn authentication_step(
        &self,
        _index: usize,
        _payload: Value,
    ) -> Result<AuthenticationStepResult, HomeboxError> {
        Err(not_implemented(Capability::Authentication))
    }

    // -- commands -----------------------------------------------------------

    async fn commands(&self) -> Result<Vec<CommandDescription>, HomeboxError> {
        Err(not_implemented(Capability::Commands))
    }

    /// Execute `command` on `device`. `payload` has already been validated
    /// against the command's schema.
    async fn run_command(
        &self,
        _device: &Device,
        _command: &str,
        _payload: Value,
    ) -> Result<(), HomeboxError> {
        Err(not_implemented(Capability::Commands))
    }

    // -- events -------------------------------------------------------------

    async fn events(&self) -> Result<Vec<EventDescription>, HomeboxError> {
        Err(not_implemented(Capability::Events))
    }
}

fn not_implemented(capability: Capability) -> HomeboxError {
    DriverError::untagged(DriverFault::CapabilityNotImplemented(capability)).into()
}
