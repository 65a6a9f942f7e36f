//! Driver registry: builds drivers from the catalog at startup and indexes
//! them by id for the rest of the process lifetime.
//!
//! The set of loaded drivers is fixed once [`DriverRegistry::load`] returns,
//! so lookups take no lock. A driver whose `init` fails while failures are
//! tolerated is disabled rather than removed.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use homebox_domain::driver::{Capabilities, Capability};
use homebox_domain::error::{DriverError, DriverFault, HomeboxError, NotFoundError};
use homebox_domain::id::DriverId;

use crate::ports::{Driver, DriverContext};

/// Builds a driver from its free-form settings.
pub type DriverFactory = fn(&Value) -> Result<Arc<dyn Driver>, HomeboxError>;

/// Every driver the binary was built with, keyed by id.
#[derive(Default)]
pub struct DriverCatalog {
    factories: BTreeMap<DriverId, DriverFactory>,
}

impl DriverCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `factory` available under `id`.
    #[must_use]
    pub fn register(mut self, id: impl Into<String>, factory: DriverFactory) -> Self {
        self.factories.insert(DriverId::new(id), factory);
        self
    }

    fn factory(&self, id: &DriverId) -> Option<DriverFactory> {
        self.factories.get(id).copied()
    }
}

/// Which drivers to load and how.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Driver ids to instantiate, in load order.
    pub enabled: Vec<DriverId>,
    /// Log and skip drivers that fail to load or init instead of aborting.
    pub skip_failed: bool,
    /// Per-driver settings handed to the factory; missing means `{}`.
    pub settings: BTreeMap<DriverId, Value>,
}

/// A loaded driver plus what the hub knows about it.
#[derive(Clone)]
pub struct DriverHandle {
    id: DriverId,
    capabilities: Capabilities,
    driver: Arc<dyn Driver>,
    disabled: Arc<AtomicBool>,
}

impl DriverHandle {
    fn new(id: DriverId, driver: Arc<dyn Driver>) -> Self {
        Self {
            id,
            capabilities: driver.capabilities(),
            driver,
            disabled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn id(&self) -> &DriverId {
        &self.id
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    fn is_enabled(&self) -> bool {
        !self.disabled.load(Ordering::Acquire)
    }

    /// Invoke the driver on its own task.
    ///
    /// A slow driver only holds up its caller. Driver and connection faults
    /// come back tagged with this driver's id; a panicking driver surfaces as
    /// [`HomeboxError::Internal`].
    ///
    /// # Errors
    ///
    /// Whatever the driver call returns, or `Internal` if the task panicked.
    pub async fn call<T, F, Fut>(&self, call: F) -> Result<T, HomeboxError>
    where
        F: FnOnce(Arc<dyn Driver>) -> Fut,
        Fut: Future<Output = Result<T, HomeboxError>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(call(Arc::clone(&self.driver)))
            .await
            .map_err(HomeboxError::internal)?
            .map_err(|err| err.tag_driver(&self.id))
    }
}

impl fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverHandle")
            .field("id", &self.id)
            .field("capabilities", &self.capabilities)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

/// Process-wide index of loaded drivers.
#[derive(Debug, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<DriverId, DriverHandle>,
    skip_failed: bool,
}

impl DriverRegistry {
    /// Instantiate every enabled driver from `catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::NotFound`] for an id missing from the catalog,
    /// or the factory's error (tagged with the driver id), unless
    /// `config.skip_failed` is set, in which case the driver is skipped.
    pub fn load(catalog: &DriverCatalog, config: &RegistryConfig) -> Result<Self, HomeboxError> {
        let empty = Value::Object(serde_json::Map::new());
        let mut drivers = BTreeMap::new();

        for id in &config.enabled {
            let settings = config.settings.get(id).unwrap_or(&empty);
            let built = catalog
                .factory(id)
                .ok_or_else(|| HomeboxError::from(NotFoundError::new("Driver", id)))
                .and_then(|factory| factory(settings))
                .map_err(|err| err.tag_driver(id));

            match built {
                Ok(driver) => {
                    let handle = DriverHandle::new(id.clone(), driver);
                    tracing::info!(
                        driver = %id,
                        capabilities = ?handle.capabilities().iter().collect::<Vec<_>>(),
                        "driver loaded"
                    );
                    drivers.insert(id.clone(), handle);
                }
                Err(err) if config.skip_failed => {
                    tracing::warn!(
                        driver = %id,
                        error = %err,
                        "skipping driver that failed to load"
                    );
                }
                Err(err) => {
                    tracing::error!(driver = %id, error = %err, "driver failed to load");
                    return Err(err);
                }
            }
        }

        Ok(Self {
            drivers,
            skip_failed: config.skip_failed,
        })
    }

    /// Build a registry around already constructed drivers.
    pub fn from_drivers<I>(drivers: I) -> Self
    where
        I: IntoIterator<Item = (DriverId, Arc<dyn Driver>)>,
    {
        Self {
            drivers: drivers
                .into_iter()
                .map(|(id, driver)| (id.clone(), DriverHandle::new(id, driver)))
                .collect(),
            skip_failed: false,
        }
    }

    /// Call [`Driver::init`] on every driver, each with its own context.
    ///
    /// # Errors
    ///
    /// Returns the first init failure unless failures are tolerated, in
    /// which case the failing driver is disabled and the rest continue.
    pub async fn start<F>(&self, context: F) -> Result<(), HomeboxError>
    where
        F: Fn(&DriverId) -> Arc<dyn DriverContext>,
    {
        for handle in self.drivers.values() {
            let ctx = context(handle.id());
            let started = match check_reserved_names(handle).await {
                Ok(()) => {
                    handle
                        .call(move |driver| async move { driver.init(ctx).await })
                        .await
                }
                Err(err) => Err(err),
            };
            match started {
                Ok(()) => tracing::info!(driver = %handle.id(), "driver started"),
                Err(err) if self.skip_failed => {
                    tracing::warn!(
                        driver = %handle.id(),
                        error = %err,
                        "disabling driver that failed to start"
                    );
                    handle.disabled.store(true, Ordering::Release);
                }
                Err(err) => {
                    tracing::error!(driver = %handle.id(), error = %err, "driver failed to start");
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Call [`Driver::teardown`] on every driver. Failures are logged.
    pub async fn shutdown(&self) {
        for handle in self.drivers.values() {
            match handle
                .call(|driver| async move { driver.teardown().await })
                .await
            {
                Ok(()) => tracing::info!(driver = %handle.id(), "driver stopped"),
                Err(err) => {
                    tracing::warn!(driver = %handle.id(), error = %err, "driver teardown failed");
                }
            }
        }
    }

    /// Whether `id` is loaded, enabled, and implements `capability`.
    #[must_use]
    pub fn exists(&self, id: &DriverId, capability: Capability) -> bool {
        self.drivers
            .get(id)
            .is_some_and(|handle| handle.is_enabled() && handle.supports(capability))
    }

    /// Look up a loaded driver.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::NotFound`] if no enabled driver has this id.
    pub fn get(&self, id: &DriverId) -> Result<DriverHandle, HomeboxError> {
        self.drivers
            .get(id)
            .filter(|handle| handle.is_enabled())
            .cloned()
            .ok_or_else(|| NotFoundError::new("Driver", id).into())
    }

    /// Look up a driver that implements `capability`.
    ///
    /// # Errors
    ///
    /// Returns [`HomeboxError::NotFound`] unless
    /// [`exists(id, capability)`](Self::exists) holds.
    pub fn require(
        &self,
        id: &DriverId,
        capability: Capability,
    ) -> Result<DriverHandle, HomeboxError> {
        if !self.exists(id, capability) {
            tracing::debug!(driver = %id, %capability, "driver missing or lacks capability");
            return Err(NotFoundError::new("Driver", id).into());
        }
        self.get(id)
    }

    /// Enabled drivers, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &DriverHandle> {
        self.drivers.values().filter(|handle| handle.is_enabled())
    }

    /// Enabled drivers implementing `capability`.
    pub fn with_capability(&self, capability: Capability) -> impl Iterator<Item = &DriverHandle> {
        self.iter()
            .filter(move |handle| handle.supports(capability))
    }
}

/// Reject commands and event types whose names collide with fixed routes.
async fn check_reserved_names(handle: &DriverHandle) -> Result<(), HomeboxError> {
    if handle.supports(Capability::Commands) {
        let commands = handle
            .call(|driver| async move { driver.commands().await })
            .await?;
        if let Some(command) = commands.iter().find(|c| c.is_reserved()) {
            return Err(contract_fault(
                handle.id(),
                DriverFault::ReservedName {
                    kind: "command",
                    name: command.name.clone(),
                },
            ));
        }
    }
    if handle.supports(Capability::Events) {
        let events = handle
            .call(|driver| async move { driver.events().await })
            .await?;
        if let Some(event) = events.iter().find(|e| e.is_reserved()) {
            return Err(contract_fault(
                handle.id(),
                DriverFault::ReservedName {
                    kind: "event",
                    name: event.event_type.clone(),
                },
            ));
        }
    }
    Ok(())
}

/// Contract fault attributed to `driver`, logged as an operability signal.
pub(crate) fn contract_fault(driver: &DriverId, fault: DriverFault) -> HomeboxError {
    tracing::error!(driver = %driver, %fault, "driver contract violation");
    DriverError::new(driver.clone(), fault).into()
}
