//! Two-step pairing with the virtual bridge: hand over an API key, then
//! confirm the link.

use std::sync::Mutex;

use serde::Deserialize;
use serde_json::Value;

use homebox_domain::authentication::{AuthenticationStep, AuthenticationStepResult};
use homebox_domain::error::{DriverError, DriverFault, HomeboxError, NotFoundError};

#[derive(Debug, Default)]
struct Progress {
    pending_key: Option<String>,
    paired_key: Option<String>,
}

#[derive(Deserialize)]
struct ApiKeyAnswer {
    key: String,
}

#[derive(Deserialize)]
struct ConfirmAnswer {
    confirmed: bool,
}

/// Pairing state of the bridge. Concurrent attempts share it; the last key
/// submitted is the one confirmed.
pub struct Pairing {
    expected_key: Option<String>,
    progress: Mutex<Progress>,
}

impl Pairing {
    /// When `expected_key` is set, only that key is accepted.
    #[must_use]
    pub fn new(expected_key: Option<String>) -> Self {
        Self {
            expected_key,
            progress: Mutex::new(Progress::default()),
        }
    }

    #[must_use]
    pub fn process() -> Vec<AuthenticationStep> {
        vec![
            AuthenticationStep::new("apiKey")
                .with("prompt", "Paste the API key shown on the virtual bridge"),
            AuthenticationStep::new("confirm")
                .with("message", "Link homebox with the virtual bridge?"),
        ]
    }

    /// The key the bridge was paired with, if pairing completed.
    #[must_use]
    pub fn paired_key(&self) -> Option<String> {
        self.lock().paired_key.clone()
    }

    /// # Errors
    ///
    /// Returns [`HomeboxError::NotFound`] for an index past the two steps,
    /// or a driver fault if the payload does not decode.
    pub fn step(
        &self,
        index: usize,
        payload: Value,
    ) -> Result<AuthenticationStepResult, HomeboxError> {
        match index {
            0 => {
                let ApiKeyAnswer { key } = decode(payload)?;
                if self.expected_key.as_deref().is_some_and(|k| k != key) {
                    return Ok(AuthenticationStepResult::failure("the API key was not accepted"));
                }
                self.lock().pending_key = Some(key);
                Ok(AuthenticationStepResult::success())
            }
            1 => {
                let ConfirmAnswer { confirmed } = decode(payload)?;
                let mut progress = self.lock();
                let Some(key) = progress.pending_key.take() else {
                    return Ok(AuthenticationStepResult::failure(
                        "submit the API key before confirming",
                    ));
                };
                if !confirmed {
                    return Ok(AuthenticationStepResult::failure("pairing cancelled"));
                }
                progress.paired_key = Some(key);
                tracing::info!("virtual bridge paired");
                Ok(AuthenticationStepResult::success())
            }
            other => Err(NotFoundError::new("Authentication step", other).into()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Progress> {
        self.progress
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, HomeboxError> {
    serde_json::from_value(payload).map_err(|err| {
        DriverError::untagged(DriverFault::Failed(format!("unexpected step payload: {err}"))).into()
    })
}
