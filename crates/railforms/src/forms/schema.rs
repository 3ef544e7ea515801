//! Schema definitions and the validation engine.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::trace;

/// Canonical rendering of calendar dates at every boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Primitive type expected for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A JSON string.
    Text,
    /// A calendar date given as a `YYYY-MM-DD` string.
    Date,
    /// A JSON object, stored as-is.
    Object,
}

impl FieldType {
    /// Check a value and return its normalized form.
    fn normalize(self, value: &Value) -> Result<Value, IssueKind> {
        match (self, value) {
            (Self::Text, Value::String(_)) | (Self::Object, Value::Object(_)) => Ok(value.clone()),
            (Self::Date, Value::String(raw)) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map(|date| Value::String(date.format(DATE_FORMAT).to_string()))
                .map_err(|_| IssueKind::InvalidDate { value: raw.clone() }),
            _ => Err(IssueKind::WrongType {
                expected: self.json_name(),
                found: json_type_name(value),
            }),
        }
    }

    /// The JSON shape this type accepts, for error messages.
    fn json_name(self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Date => "date string (YYYY-MM-DD)",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.pad("text"),
            Self::Date => f.pad("date"),
            Self::Object => f.pad("object"),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single key a form kind knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Key in the `fields` mapping.
    pub name: String,
    /// Expected primitive type.
    pub field_type: FieldType,
    /// Whether the key must be present and non-null.
    pub required: bool,
}

/// The shape of one form kind's `fields` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSchema {
    /// Kind name used for lookup and in stored rows, e.g. `bogie-checksheet`.
    pub name: String,
    /// Human readable title.
    pub title: String,
    /// Known keys, in declaration order.
    pub fields: Vec<FieldSpec>,
}

impl FormSchema {
    /// Create an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            fields: Vec::new(),
        }
    }

    /// Declare a required key.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            field_type,
            required: true,
        });
        self
    }

    /// Declare an optional key. When present and non-null it must still match
    /// `field_type`.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            field_type,
            required: false,
        });
        self
    }

    /// Iterate over the required keys.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|spec| spec.required)
    }

    /// Validate an arbitrary JSON payload.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every problem if the payload is
    /// not an object or any known key is missing or mistyped.
    pub fn validate(&self, payload: &Value) -> Result<Map<String, Value>, ValidationError> {
        match payload {
            Value::Object(map) => self.normalize(map.clone()),
            other => Err(ValidationError::new(
                &self.name,
                vec![FieldIssue::new(
                    "fields",
                    IssueKind::WrongType {
                        expected: "object",
                        found: json_type_name(other),
                    },
                )],
            )),
        }
    }

    /// Validate and normalize a `fields` mapping in place.
    ///
    /// Known keys are replaced by their normalized value; unknown keys and
    /// key order are left exactly as given. Absent optional keys stay absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every missing or mistyped key.
    pub fn normalize(
        &self,
        mut fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, ValidationError> {
        let mut issues = Vec::new();

        for spec in &self.fields {
            match fields.get_mut(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        issues.push(FieldIssue::missing(&spec.name));
                    }
                }
                Some(value) => match spec.field_type.normalize(value) {
                    Ok(normalized) => *value = normalized,
                    Err(problem) => issues.push(FieldIssue::new(&spec.name, problem)),
                },
            }
        }

        if issues.is_empty() {
            trace!(form = %self.name, keys = fields.len(), "Fields payload validated");
            Ok(fields)
        } else {
            Err(ValidationError::new(&self.name, issues))
        }
    }
}

/// What was wrong with one key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueKind {
    /// The key is required but absent or null.
    #[error("field required")]
    Missing,

    /// The key is present but blank.
    #[error("must not be blank")]
    Blank,

    /// The value has the wrong JSON type.
    #[error("expected {expected}, found {found}")]
    WrongType {
        /// The accepted shape.
        expected: &'static str,
        /// The JSON type actually supplied.
        found: &'static str,
    },

    /// A date string that is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input.
        value: String,
    },
}

/// A problem found with one key of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {problem}")]
pub struct FieldIssue {
    /// The offending key.
    pub field: String,
    /// What was wrong with it.
    pub problem: IssueKind,
}

impl FieldIssue {
    /// Create an issue for a key.
    #[must_use]
    pub fn new(field: impl Into<String>, problem: IssueKind) -> Self {
        Self {
            field: field.into(),
            problem,
        }
    }

    /// Create a missing-key issue.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, IssueKind::Missing)
    }

    /// Create a blank-value issue.
    #[must_use]
    pub fn blank(field: impl Into<String>) -> Self {
        Self::new(field, IssueKind::Blank)
    }
}

/// A payload was rejected by its form schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {form} payload: {}", join_issues(.issues))]
pub struct ValidationError {
    /// The form kind the payload was checked against.
    pub form: String,
    /// Every problem found, in schema order.
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Create a validation error.
    #[must_use]
    pub fn new(form: impl Into<String>, issues: Vec<FieldIssue>) -> Self {
        Self {
            form: form.into(),
            issues,
        }
    }

    /// Keys reported as missing.
    pub fn missing_fields(&self) -> impl Iterator<Item = &str> {
        self.issues
            .iter()
            .filter(|issue| issue.problem == IssueKind::Missing)
            .map(|issue| issue.field.as_str())
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
