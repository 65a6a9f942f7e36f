//! Commands: named operations a driver accepts for its devices.

use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// Names the HTTP surface routes as paths of their own, so no command may
/// use them.
pub const RESERVED_COMMAND_NAMES: &[&str] = &["failedRemovalInstructions"];

/// A command a driver declares, with the schema its payload must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Schema,
}

impl CommandDescription {
    pub fn new(name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema: schema.into(),
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn is_reserved(&self) -> bool {
        RESERVED_COMMAND_NAMES.contains(&self.name.as_str())
    }
}
