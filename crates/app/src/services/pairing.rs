//! Pairing session: one caller's walk through a driver's pairing flow.
//!
//! The [`AuthenticationEngine`] is stateless. A session remembers the step
//! types it was shown when the process was described and submits every
//! answer pinned to that type, so a driver that reshuffles its process
//! mid-attempt is caught instead of silently misaligning steps.

use serde_json::Value;

use homebox_domain::authentication::{AuthenticationProcess, AuthenticationStepResult};
use homebox_domain::error::{ErrorKind, HomeboxError, ValidationError};
use homebox_domain::id::DriverId;

use super::authentication::AuthenticationEngine;

/// Where a pairing attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    NotStarted,
    ProcessDescribed,
    /// Waiting for the answer to this (0-based) step.
    Step(usize),
    Completed,
    Failed,
}

/// A single pairing attempt against one driver.
#[derive(Debug)]
pub struct PairingSession {
    driver: DriverId,
    step_types: Vec<String>,
    state: PairingState,
}

impl PairingSession {
    #[must_use]
    pub fn new(driver: DriverId) -> Self {
        Self {
            driver,
            step_types: Vec::new(),
            state: PairingState::NotStarted,
        }
    }

    #[must_use]
    pub fn state(&self) -> PairingState {
        self.state
    }

    #[must_use]
    pub fn driver(&self) -> &DriverId {
        &self.driver
    }

    /// Describe the process and pin its step types. Restarts the attempt if
    /// it was already running.
    ///
    /// # Errors
    ///
    /// Whatever [`AuthenticationEngine::describe_process`] returns; the
    /// session is then [`PairingState::Failed`].
    pub async fn describe(
        &mut self,
        engine: &AuthenticationEngine,
    ) -> Result<AuthenticationProcess, HomeboxError> {
        match engine.describe_process(&self.driver).await {
            Ok(process) => {
                self.step_types = process
                    .steps()
                    .iter()
                    .map(|step| step.step_type.clone())
                    .collect();
                self.state = if process.is_empty() {
                    PairingState::Completed
                } else {
                    PairingState::ProcessDescribed
                };
                Ok(process)
            }
            Err(err) => {
                self.state = PairingState::Failed;
                Err(err)
            }
        }
    }

    /// Answer the current step.
    ///
    /// A successful result moves to the next step (or completes); a failed
    /// result fails the attempt. A rejected payload or a connection fault
    /// leaves the session on the same step so the caller can retry.
    ///
    /// # Errors
    ///
    /// [`HomeboxError::Validation`] if the session is not waiting for an
    /// answer, otherwise whatever the engine returns.
    pub async fn submit(
        &mut self,
        engine: &AuthenticationEngine,
        payload: Value,
    ) -> Result<AuthenticationStepResult, HomeboxError> {
        let index = match self.state {
            PairingState::ProcessDescribed => 0,
            PairingState::Step(index) => index,
            state => {
                return Err(ValidationError::Invalid {
                    field: "step",
                    reason: format!("pairing session is not awaiting a step ({state:?})"),
                }
                .into());
            }
        };
        let expected = self.step_types.get(index).cloned().unwrap_or_default();

        match engine
            .execute_pinned_step(&self.driver, index, &expected, payload)
            .await
        {
            Ok(result) if result.success => {
                self.state = if index + 1 >= self.step_types.len() {
                    PairingState::Completed
                } else {
                    PairingState::Step(index + 1)
                };
                Ok(result)
            }
            Ok(result) => {
                self.state = PairingState::Failed;
                Ok(result)
            }
            Err(err) => {
                if !matches!(err.kind(), ErrorKind::BadRequest | ErrorKind::Connection) {
                    self.state = PairingState::Failed;
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use homebox_domain::authentication::AuthenticationStep;
    use homebox_domain::driver::{Capabilities, Capability};

    use super::*;
    use crate::ports::Driver;
    use crate::registry::DriverRegistry;
    use crate::testing::StubDriver;

    fn setup(driver: StubDriver) -> (AuthenticationEngine, Arc<StubDriver>) {
        let driver = Arc::new(driver);
        let registry = DriverRegistry::from_drivers([(
            DriverId::new("x"),
            Arc::clone(&driver) as Arc<dyn Driver>,
        )]);
        (AuthenticationEngine::new(Arc::new(registry)), driver)
    }

    fn two_steps() -> Vec<AuthenticationStep> {
        vec![
            AuthenticationStep::new("apiKey").with("prompt", "Paste the key"),
            AuthenticationStep::new("confirm").with("message", "Link the hub?"),
        ]
    }

    #[tokio::test]
    async fn should_walk_states_until_completed() {
        let (engine, _) = setup(
            StubDriver::new(Capabilities::none().with(Capability::Authentication))
                .with_process(two_steps()),
        );
        let mut session = PairingSession::new(DriverId::new("x"));
        assert_eq!(session.state(), PairingState::NotStarted);

        session.describe(&engine).await.unwrap();
        assert_eq!(session.state(), PairingState::ProcessDescribed);

        session
            .submit(&engine, json!({"key": "abc"}))
            .await
            .unwrap();
        assert_eq!(session.state(), PairingState::Step(1));

        session
            .submit(&engine, json!({"confirmed": true}))
            .await
            .unwrap();
        assert_eq!(session.state(), PairingState::Completed);

        let err = session.submit(&engine, json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn should_stay_on_step_when_payload_rejected() {
        let (engine, _) = setup(StubDriver::new(Capabilities::all()).with_process(two_steps()));
        let mut session = PairingSession::new(DriverId::new("x"));
        session.describe(&engine).await.unwrap();

        let err = session
            .submit(&engine, json!({"nope": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(session.state(), PairingState::ProcessDescribed);
    }

    #[tokio::test]
    async fn should_fail_when_driver_reports_failure() {
        let (engine, _) = setup(
            StubDriver::new(Capabilities::all())
                .with_process(two_steps())
                .with_step_result(AuthenticationStepResult::failure("wrong key")),
        );
        let mut session = PairingSession::new(DriverId::new("x"));
        session.describe(&engine).await.unwrap();

        let result = session
            .submit(&engine, json!({"key": "abc"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(session.state(), PairingState::Failed);
    }

    #[tokio::test]
    async fn should_fail_when_process_changes_mid_attempt() {
        let (engine, driver) =
            setup(StubDriver::new(Capabilities::all()).with_process(two_steps()));
        let mut session = PairingSession::new(DriverId::new("x"));
        session.describe(&engine).await.unwrap();
        session
            .submit(&engine, json!({"key": "abc"}))
            .await
            .unwrap();

        driver.replace_process(vec![
            AuthenticationStep::new("apiKey").with("prompt", "Paste the key"),
            AuthenticationStep::new("pin").with("prompt", "PIN?"),
        ]);

        let err = session
            .submit(&engine, json!({"confirmed": true}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Driver);
        assert_eq!(session.state(), PairingState::Failed);
    }

    #[tokio::test]
    async fn should_complete_immediately_when_process_empty() {
        let (engine, _) = setup(StubDriver::new(Capabilities::all()).with_process(vec![]));
        let mut session = PairingSession::new(DriverId::new("x"));
        session.describe(&engine).await.unwrap();
        assert_eq!(session.state(), PairingState::Completed);
    }
}
