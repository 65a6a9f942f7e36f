//! Authentication (pairing): the step descriptors a driver publishes and
//! the schemas that govern them.
//!
//! A driver describes its pairing flow as an ordered list of
//! [`AuthenticationStep`]s. Each step carries a `type` tag; the tag selects a
//! [`StepSchemas`] pair from an [`AuthenticationSchemas`] catalog:
//!
//! - `requested`: the shape of the step descriptor shown to the caller,
//! - `returned`: the shape of the payload the caller sends back.
//!
//! Every step handler answers with an [`AuthenticationStepResult`], itself
//! checked against [`AuthenticationStepResult::schema`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::schema::{ObjectSchema, Schema};

/// One step of a pairing flow, as published by a driver.
///
/// Serializes to a flat object: `{"type": "externalUrl", "url": "…"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationStep {
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl AuthenticationStep {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            data: Map::new(),
        }
    }

    /// Attach a descriptive field (a URL to open, a prompt, …).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// The flat JSON form validated against the `requested` schema.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = self.data.clone();
        object.insert("type".to_string(), Value::String(self.step_type.clone()));
        Value::Object(object)
    }
}

/// An ordered pairing flow. Step indices are positions in this list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthenticationProcess(Vec<AuthenticationStep>);

impl AuthenticationProcess {
    #[must_use]
    pub fn new(steps: Vec<AuthenticationStep>) -> Self {
        Self(steps)
    }

    #[must_use]
    pub fn steps(&self) -> &[AuthenticationStep] {
        &self.0
    }

    #[must_use]
    pub fn step(&self, index: usize) -> Option<&AuthenticationStep> {
        self.0.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<AuthenticationStep> for AuthenticationProcess {
    fn from_iter<I: IntoIterator<Item = AuthenticationStep>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of a single step handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationStepResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AuthenticationStepResult {
    #[must_use]
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    /// `{success: bool, message: string}` with `message` required iff
    /// `success` is `false`.
    #[must_use]
    pub fn schema() -> Schema {
        Schema::object()
            .required_property("success", Schema::boolean())
            .property("message", Schema::string())
            .require_when("success", json!(false), ["message"])
            .into()
    }
}

/// Requested/returned schema pair for one step type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSchemas {
    pub requested: Schema,
    pub returned: Schema,
}

impl StepSchemas {
    /// Pair for `step_type`: the descriptor must carry `"type": step_type`
    /// plus `requested`; the caller answers with `returned`.
    #[must_use]
    pub fn for_type(step_type: &str, requested: ObjectSchema, returned: ObjectSchema) -> Self {
        Self {
            requested: requested
                .required_property("type", Schema::enumeration([json!(step_type)]))
                .into(),
            returned: returned.into(),
        }
    }
}

/// Catalog of step types, keyed by `type` tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthenticationSchemas(BTreeMap<String, StepSchemas>);

impl AuthenticationSchemas {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The step types every driver may use without declaring them.
    #[must_use]
    pub fn builtin() -> Self {
        [
            builtin_entry(
                "manual",
                Schema::object().required_property("instructions", Schema::non_empty_string()),
                Schema::object(),
            ),
            builtin_entry(
                "externalUrl",
                Schema::object()
                    .required_property("url", Schema::non_empty_string())
                    .property("description", Schema::string()),
                Schema::object(),
            ),
            builtin_entry(
                "requestData",
                Schema::object()
                    .required_property("dataLabel", Schema::non_empty_string())
                    .property("description", Schema::string()),
                Schema::object().required_property("data", Schema::non_empty_string()),
            ),
            builtin_entry(
                "apiKey",
                Schema::object().required_property("prompt", Schema::non_empty_string()),
                Schema::object().required_property("key", Schema::non_empty_string()),
            ),
            builtin_entry(
                "pin",
                Schema::object()
                    .required_property("prompt", Schema::non_empty_string())
                    .property("digits", Schema::integer_range(1, 16)),
                Schema::object().required_property("pin", Schema::non_empty_string()),
            ),
            builtin_entry(
                "confirm",
                Schema::object().required_property("message", Schema::non_empty_string()),
                Schema::object().required_property("confirmed", Schema::boolean()),
            ),
        ]
        .into_iter()
        .collect()
    }

    /// Register (or replace) the schemas for `step_type`.
    #[must_use]
    pub fn register(mut self, step_type: impl Into<String>, schemas: StepSchemas) -> Self {
        self.0.insert(step_type.into(), schemas);
        self
    }

    /// Layer `overrides` on top of `self`; entries in `overrides` win.
    #[must_use]
    pub fn merged(mut self, overrides: Self) -> Self {
        self.0.extend(overrides.0);
        self
    }

    #[must_use]
    pub fn get(&self, step_type: &str) -> Option<&StepSchemas> {
        self.0.get(step_type)
    }

    #[must_use]
    pub fn requested(&self, step_type: &str) -> Option<&Schema> {
        self.get(step_type).map(|schemas| &schemas.requested)
    }

    #[must_use]
    pub fn returned(&self, step_type: &str) -> Option<&Schema> {
        self.get(step_type).map(|schemas| &schemas.returned)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

fn builtin_entry(
    step_type: &str,
    requested: ObjectSchema,
    returned: ObjectSchema,
) -> (String, StepSchemas) {
    (
        step_type.to_string(),
        StepSchemas::for_type(step_type, requested, returned),
    )
}

impl FromIterator<(String, StepSchemas)> for AuthenticationSchemas {
    fn from_iter<I: IntoIterator<Item = (String, StepSchemas)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
