//! In-memory port implementations and a scriptable driver for unit tests.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use homebox_domain::authentication::{
    AuthenticationSchemas, AuthenticationStep, AuthenticationStepResult,
};
use homebox_domain::command::CommandDescription;
use homebox_domain::device::Device;
use homebox_domain::driver::Capabilities;
use homebox_domain::error::{
    ConnectionError, DriverError, DriverFault, HomeboxError, NotFoundError,
};
use homebox_domain::event::{Event, EventDescription, EventDraft};
use homebox_domain::id::{DeviceId, DriverId};
use homebox_domain::time::Timestamp;

use crate::ports::{DeviceRepository, Driver, DriverContext, EventStore};

pub(crate) fn device(id: &str, driver: &str) -> Device {
    Device::builder()
        .id(id)
        .driver(DriverId::new(driver))
        .name(format!("Device {id}"))
        .device_type("light")
        .build()
        .unwrap()
}

#[derive(Default)]
pub(crate) struct InMemoryDeviceRepo {
    store: Mutex<BTreeMap<DeviceId, Device>>,
}

impl InMemoryDeviceRepo {
    pub(crate) fn insert(&self, device: Device) {
        self.store.lock().unwrap().insert(device.id.clone(), device);
    }
}

impl DeviceRepository for InMemoryDeviceRepo {
    fn upsert(&self, device: Device) -> impl Future<Output = Result<Device, HomeboxError>> + Send {
        self.insert(device.clone());
        async { Ok(device) }
    }

    fn get_by_id(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, HomeboxError>> + Send {
        let result = self.store.lock().unwrap().get(id).cloned();
        async { Ok(result) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, HomeboxError>> + Send {
        let result: Vec<Device> = self.store.lock().unwrap().values().cloned().collect();
        async { Ok(result) }
    }

    fn find_by_type(
        &self,
        device_type: &str,
    ) -> impl Future<Output = Result<Vec<Device>, HomeboxError>> + Send {
        let result: Vec<Device> = self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.device_type == device_type)
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn find_by_driver(
        &self,
        driver: &DriverId,
    ) -> impl Future<Output = Result<Vec<Device>, HomeboxError>> + Send {
        let result: Vec<Device> = self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.driver == *driver)
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn delete(&self, id: &DeviceId) -> impl Future<Output = Result<(), HomeboxError>> + Send {
        self.store.lock().unwrap().remove(id);
        async { Ok(()) }
    }
}

/// Events kept in insertion order.
#[derive(Default)]
pub(crate) struct InMemoryEventStore {
    events: Mutex<Vec<Event>>,
}

impl EventStore for InMemoryEventStore {
    fn append(&self, event: Event) -> impl Future<Output = Result<Event, HomeboxError>> + Send {
        self.events.lock().unwrap().push(event.clone());
        async { Ok(event) }
    }

    fn latest_by_type(&self) -> impl Future<Output = Result<Vec<Event>, HomeboxError>> + Send {
        let mut latest: BTreeMap<String, Event> = BTreeMap::new();
        for event in self.events.lock().unwrap().iter() {
            let newer = latest
                .get(&event.event_type)
                .is_none_or(|current| event.timestamp >= current.timestamp);
            if newer {
                latest.insert(event.event_type.clone(), event.clone());
            }
        }
        async { Ok(latest.into_values().collect()) }
    }

    fn find_by_type(
        &self,
        event_type: &str,
        since: Option<Timestamp>,
    ) -> impl Future<Output = Result<Vec<Event>, HomeboxError>> + Send {
        let mut found: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .filter(|e| since.is_none_or(|since| e.timestamp >= since))
            .cloned()
            .collect();
        found.sort_by_key(|e| e.timestamp);
        async { Ok(found) }
    }
}

/// Context that accepts everything and remembers nothing.
pub(crate) struct NoopContext {
    driver: DriverId,
}

impl NoopContext {
    pub(crate) fn new(driver: DriverId) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl DriverContext for NoopContext {
    fn driver_id(&self) -> &DriverId {
        &self.driver
    }

    async fn upsert_device(&self, device: Device) -> Result<Device, HomeboxError> {
        Ok(device)
    }

    async fn emit(&self, event: EventDraft) -> Result<Event, HomeboxError> {
        Ok(Event::accept(self.driver.clone(), event))
    }
}

/// A driver whose answers are set up front and whose calls are recorded.
pub(crate) struct StubDriver {
    capabilities: Capabilities,
    process: Mutex<Vec<AuthenticationStep>>,
    schemas: AuthenticationSchemas,
    step_result: AuthenticationStepResult,
    commands: Vec<CommandDescription>,
    events: Vec<EventDescription>,
    devices: Vec<Device>,
    instructions: Option<String>,
    fail_init: bool,
    fail_commands: bool,
    calls: Mutex<Vec<String>>,
}

impl StubDriver {
    pub(crate) fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            process: Mutex::new(Vec::new()),
            schemas: AuthenticationSchemas::empty(),
            step_result: AuthenticationStepResult::success(),
            commands: Vec::new(),
            events: Vec::new(),
            devices: Vec::new(),
            instructions: None,
            fail_init: false,
            fail_commands: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_process(self, steps: Vec<AuthenticationStep>) -> Self {
        self.replace_process(steps);
        self
    }

    pub(crate) fn replace_process(&self, steps: Vec<AuthenticationStep>) {
        *self.process.lock().unwrap() = steps;
    }

    pub(crate) fn with_schemas(mut self, schemas: AuthenticationSchemas) -> Self {
        self.schemas = schemas;
        self
    }

    pub(crate) fn with_step_result(mut self, result: AuthenticationStepResult) -> Self {
        self.step_result = result;
        self
    }

    pub(crate) fn with_commands(mut self, commands: Vec<CommandDescription>) -> Self {
        self.commands = commands;
        self
    }

    pub(crate) fn with_events(mut self, events: Vec<EventDescription>) -> Self {
        self.events = events;
        self
    }

    pub(crate) fn with_devices(mut self, devices: Vec<Device>) -> Self {
        self.devices = devices;
        self
    }

    pub(crate) fn with_instructions(mut self, text: &str) -> Self {
        self.instructions = Some(text.to_string());
        self
    }

    pub(crate) fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Command handlers and device removal fail as if the device were
    /// unreachable.
    pub(crate) fn failing_commands(mut self) -> Self {
        self.fail_commands = true;
        self
    }

    /// Handler invocations so far, e.g. `"authentication_step:0"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Driver for StubDriver {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn init(&self, _ctx: Arc<dyn DriverContext>) -> Result<(), HomeboxError> {
        if self.fail_init {
            return Err(DriverError::untagged(DriverFault::Failed("init failed".into())).into());
        }
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<Device>, HomeboxError> {
        Ok(self.devices.clone())
    }

    async fn pairing_instructions(&self) -> Result<Option<String>, HomeboxError> {
        Ok(self.instructions.clone())
    }

    async fn failed_removal_instructions(
        &self,
        _device: &Device,
    ) -> Result<Option<String>, HomeboxError> {
        Ok(self.instructions.clone())
    }

    async fn remove_device(&self, device: &Device) -> Result<(), HomeboxError> {
        if self.fail_commands {
            return Err(ConnectionError::new("bridge unreachable").into());
        }
        self.record(format!("remove_device:{}", device.id));
        Ok(())
    }

    async fn authentication_process(&self) -> Result<Vec<AuthenticationStep>, HomeboxError> {
        Ok(self.process.lock().unwrap().clone())
    }

    async fn authentication_schemas(&self) -> Result<AuthenticationSchemas, HomeboxError> {
        Ok(self.schemas.clone())
    }

    async fn authentication_step(
        &self,
        index: usize,
        _payload: Value,
    ) -> Result<AuthenticationStepResult, HomeboxError> {
        self.record(format!("authentication_step:{index}"));
        Ok(self.step_result.clone())
    }

    async fn commands(&self) -> Result<Vec<CommandDescription>, HomeboxError> {
        Ok(self.commands.clone())
    }

    async fn run_command(
        &self,
        device: &Device,
        command: &str,
        _payload: Value,
    ) -> Result<(), HomeboxError> {
        if self.fail_commands {
            return Err(NotFoundError::new("Bulb", &device.id).into());
        }
        self.record(format!("run_command:{}:{command}", device.id));
        Ok(())
    }

    async fn events(&self) -> Result<Vec<EventDescription>, HomeboxError> {
        Ok(self.events.clone())
    }
}
