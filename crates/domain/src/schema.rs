//! Schema: a small, data-driven description of a JSON payload shape.
//!
//! Drivers declare one [`Schema`] per authentication step type, command and
//! event type. [`validate`] checks an arbitrary [`serde_json::Value`] against
//! a schema and returns every violation it finds, in document order.
//!
//! Supported nodes: any, null, boolean, integer/number (with inclusive
//! bounds), string (with length bounds), enumerations of literal values,
//! arrays (item schema and length bounds) and objects (typed properties,
//! a required set, conditional requirements and an additional-properties
//! switch).
//!
//! A schema that is itself inconsistent is reported as a [`SchemaError`],
//! never as a payload violation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node of the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Schema {
    /// Accepts any value.
    Any,
    Null,
    Boolean,
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// Accepts exactly one of the listed literal values.
    Enum { values: Vec<Value> },
    Array {
        items: Box<Schema>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
    Object(ObjectSchema),
}

impl Schema {
    #[must_use]
    pub fn boolean() -> Self {
        Self::Boolean
    }

    #[must_use]
    pub fn integer() -> Self {
        Self::Integer {
            minimum: None,
            maximum: None,
        }
    }

    /// Integer within `minimum..=maximum`.
    #[must_use]
    pub fn integer_range(minimum: i64, maximum: i64) -> Self {
        Self::Integer {
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }

    #[must_use]
    pub fn number() -> Self {
        Self::Number {
            minimum: None,
            maximum: None,
        }
    }

    #[must_use]
    pub fn string() -> Self {
        Self::String {
            min_length: None,
            max_length: None,
        }
    }

    /// String with at least one character.
    #[must_use]
    pub fn non_empty_string() -> Self {
        Self::String {
            min_length: Some(1),
            max_length: None,
        }
    }

    pub fn enumeration(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Enum {
            values: values.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        }
    }

    /// Start an object schema; convert with `.into()`.
    #[must_use]
    pub fn object() -> ObjectSchema {
        ObjectSchema::default()
    }

    /// Check that the schema is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found, depth-first.
    pub fn check(&self) -> Result<(), SchemaError> {
        self.check_at("$")
    }

    fn check_at(&self, path: &str) -> Result<(), SchemaError> {
        match self {
            Self::Any | Self::Null | Self::Boolean => Ok(()),
            Self::Integer { minimum, maximum } => check_bounds(path, *minimum, *maximum),
            Self::Number { minimum, maximum } => check_bounds(path, *minimum, *maximum),
            Self::String {
                min_length,
                max_length,
            } => check_bounds(path, *min_length, *max_length),
            Self::Enum { values } => {
                if values.is_empty() {
                    return Err(SchemaError::EmptyEnum {
                        path: path.to_string(),
                    });
                }
                Ok(())
            }
            Self::Array {
                items,
                min_items,
                max_items,
            } => {
                check_bounds(path, *min_items, *max_items)?;
                items.check_at(&format!("{path}[]"))
            }
            Self::Object(object) => object.check_at(path),
        }
    }
}

fn check_bounds<T: PartialOrd>(
    path: &str,
    minimum: Option<T>,
    maximum: Option<T>,
) -> Result<(), SchemaError> {
    match (minimum, maximum) {
        (Some(min), Some(max)) if min > max => Err(SchemaError::InvertedBounds {
            path: path.to_string(),
        }),
        _ => Ok(()),
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        Self::Object(object)
    }
}

/// Object node: typed properties plus required-field rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_when: Vec<RequiredWhen>,
    #[serde(default = "default_additional_properties")]
    pub additional_properties: bool,
}

fn default_additional_properties() -> bool {
    true
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self {
            properties: BTreeMap::new(),
            required: Vec::new(),
            required_when: Vec::new(),
            additional_properties: true,
        }
    }
}

impl ObjectSchema {
    /// Declare an optional property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Declare a property that must always be present.
    #[must_use]
    pub fn required_property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, schema);
        self
    }

    /// Require `fields` whenever the sibling `field` equals `equals`.
    #[must_use]
    pub fn require_when<I, S>(mut self, field: impl Into<String>, equals: Value, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_when.push(RequiredWhen {
            field: field.into(),
            equals,
            require: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Reject properties that are not declared.
    #[must_use]
    pub fn deny_additional(mut self) -> Self {
        self.additional_properties = false;
        self
    }

    fn check_at(&self, path: &str) -> Result<(), SchemaError> {
        for rule in &self.required_when {
            if !self.properties.contains_key(&rule.field) {
                return Err(SchemaError::UnknownConditionField {
                    path: path.to_string(),
                    field: rule.field.clone(),
                });
            }
        }
        if !self.additional_properties {
            let declared = self
                .required
                .iter()
                .chain(self.required_when.iter().flat_map(|rule| &rule.require));
            for name in declared {
                if !self.properties.contains_key(name) {
                    return Err(SchemaError::UndeclaredRequired {
                        path: path.to_string(),
                        field: name.clone(),
                    });
                }
            }
        }
        for (name, schema) in &self.properties {
            schema.check_at(&format!("{path}.{name}"))?;
        }
        Ok(())
    }
}

/// Conditional requirement: when `field` equals `equals`, every name in
/// `require` must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredWhen {
    pub field: String,
    pub equals: Value,
    pub require: Vec<String>,
}

/// A schema that cannot be used for validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("{path}: minimum is greater than maximum")]
    InvertedBounds { path: String },

    #[error("{path}: enumeration has no values")]
    EmptyEnum { path: String },

    #[error("{path}: conditional requirement refers to undeclared field `{field}`")]
    UnknownConditionField { path: String, field: String },

    #[error("{path}: required field `{field}` is not declared and additional properties are denied")]
    UndeclaredRequired { path: String, field: String },
}

/// One payload violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Location in the payload, `$` being the root (e.g. `$.lights[2].level`).
    pub path: String,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Outcome of [`validate`]: every violation, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<ErrorDetail>,
}

impl ValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when valid, the violations otherwise.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ErrorDetail`]s when the payload was invalid.
    pub fn into_result(self) -> Result<(), Vec<ErrorDetail>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Validate `payload` against `schema`.
///
/// Pure and deterministic. Object properties are visited in key order so
/// repeated calls report identical error sequences.
///
/// # Errors
///
/// Returns [`SchemaError`] if `schema` itself is malformed; payload
/// violations are reported through [`ValidationResult`].
pub fn validate(payload: &Value, schema: &Schema) -> Result<ValidationResult, SchemaError> {
    schema.check()?;
    let mut errors = Vec::new();
    walk(payload, schema, "$", &mut errors);
    Ok(ValidationResult { errors })
}

fn walk(value: &Value, schema: &Schema, path: &str, errors: &mut Vec<ErrorDetail>) {
    match schema {
        Schema::Any => {}
        Schema::Null => {
            if !value.is_null() {
                errors.push(type_mismatch(path, "null", value));
            }
        }
        Schema::Boolean => {
            if !value.is_boolean() {
                errors.push(type_mismatch(path, "boolean", value));
            }
        }
        Schema::Integer { minimum, maximum } => {
            walk_integer(value, *minimum, *maximum, path, errors);
        }
        Schema::Number { minimum, maximum } => {
            let Some(number) = value.as_f64() else {
                errors.push(type_mismatch(path, "number", value));
                return;
            };
            if let Some(min) = minimum.filter(|min| number < *min) {
                errors.push(ErrorDetail::new(path, format!("must be at least {min}")));
            }
            if let Some(max) = maximum.filter(|max| number > *max) {
                errors.push(ErrorDetail::new(path, format!("must be at most {max}")));
            }
        }
        Schema::String {
            min_length,
            max_length,
        } => {
            let Some(text) = value.as_str() else {
                errors.push(type_mismatch(path, "string", value));
                return;
            };
            let length = text.chars().count();
            if let Some(min) = min_length.filter(|min| length < *min) {
                errors.push(ErrorDetail::new(
                    path,
                    format!("must be at least {min} characters long"),
                ));
            }
            if let Some(max) = max_length.filter(|max| length > *max) {
                errors.push(ErrorDetail::new(
                    path,
                    format!("must be at most {max} characters long"),
                ));
            }
        }
        Schema::Enum { values } => {
            if !values.contains(value) {
                let allowed: Vec<String> = values.iter().map(Value::to_string).collect();
                errors.push(ErrorDetail::new(
                    path,
                    format!("must be one of {}", allowed.join(", ")),
                ));
            }
        }
        Schema::Array {
            items,
            min_items,
            max_items,
        } => {
            let Some(elements) = value.as_array() else {
                errors.push(type_mismatch(path, "array", value));
                return;
            };
            if let Some(min) = min_items.filter(|min| elements.len() < *min) {
                errors.push(ErrorDetail::new(
                    path,
                    format!("must contain at least {min} items"),
                ));
            }
            if let Some(max) = max_items.filter(|max| elements.len() > *max) {
                errors.push(ErrorDetail::new(
                    path,
                    format!("must contain at most {max} items"),
                ));
            }
            for (index, element) in elements.iter().enumerate() {
                walk(element, items, &format!("{path}[{index}]"), errors);
            }
        }
        Schema::Object(object) => walk_object(value, object, path, errors),
    }
}

fn walk_integer(
    value: &Value,
    minimum: Option<i64>,
    maximum: Option<i64>,
    path: &str,
    errors: &mut Vec<ErrorDetail>,
) {
    let Value::Number(number) = value else {
        errors.push(type_mismatch(path, "integer", value));
        return;
    };
    let integer = if let Some(signed) = number.as_i64() {
        signed
    } else if number.is_u64() {
        // Larger than any i64 bound.
        i64::MAX
    } else {
        errors.push(ErrorDetail::new(path, "expected integer, found number"));
        return;
    };
    if let Some(min) = minimum.filter(|min| integer < *min) {
        errors.push(ErrorDetail::new(path, format!("must be at least {min}")));
    }
    if let Some(max) = maximum.filter(|max| integer > *max) {
        errors.push(ErrorDetail::new(path, format!("must be at most {max}")));
    }
}

fn walk_object(value: &Value, object: &ObjectSchema, path: &str, errors: &mut Vec<ErrorDetail>) {
    let Some(map) = value.as_object() else {
        errors.push(type_mismatch(path, "object", value));
        return;
    };

    for name in &object.required {
        if !map.contains_key(name) {
            errors.push(ErrorDetail::new(format!("{path}.{name}"), "is required"));
        }
    }

    for rule in &object.required_when {
        if map.get(&rule.field) != Some(&rule.equals) {
            continue;
        }
        for name in &rule.require {
            if !map.contains_key(name) && !object.required.contains(name) {
                errors.push(ErrorDetail::new(
                    format!("{path}.{name}"),
                    format!("is required when {} is {}", rule.field, rule.equals),
                ));
            }
        }
    }

    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        let child = format!("{path}.{key}");
        match object.properties.get(key) {
            Some(schema) => walk(&map[key], schema, &child, errors),
            None if !object.additional_properties => {
                errors.push(ErrorDetail::new(child, "is not allowed"));
            }
            None => {}
        }
    }
}

fn type_mismatch(path: &str, expected: &str, found: &Value) -> ErrorDetail {
    ErrorDetail::new(
        path,
        format!("expected {expected}, found {}", type_name(found)),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
