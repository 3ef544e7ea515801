//! Core record types for railforms.
//!
//! Every form kind shares the same envelope: a system-assigned id, a
//! caller-assigned form number, who submitted it and when, a lifecycle
//! status, and the open `fields` payload checked by the kind's schema.

use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle marker of a record.
///
/// Storage keeps the plain string; the well-known values get their own
/// variants and anything else round-trips through [`Status::Other`]. No
/// transition graph is enforced. Equality and hashing go through the
/// stored string, so `Other("Saved")` equals `Saved`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Initial state of every new record.
    #[default]
    Saved,
    /// Signed off by a supervisor.
    Approved,
    /// Any other caller-defined state.
    Other(String),
}

impl Status {
    /// The stored string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Saved => "Saved",
            Self::Approved => "Approved",
            Self::Other(other) => other,
        }
    }

    /// Check if the status has no visible content.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Status {}

impl Hash for Status {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Saved" => Self::Saved,
            "Approved" => Self::Approved,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Status {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// A stored form record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    /// Identifier assigned by the store.
    pub id: i64,
    /// Caller-assigned business key, unique per form kind.
    pub form_number: String,
    /// Who filled in the form.
    pub submitted_by: String,
    /// When the form was filled in.
    pub submitted_date: NaiveDate,
    /// Normalized form answers, including any extra keys.
    pub fields: Map<String, Value>,
    /// Lifecycle marker.
    pub status: Status,
}

/// A record to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFormRecord {
    /// Caller-assigned business key.
    pub form_number: String,
    /// Who filled in the form.
    pub submitted_by: String,
    /// When the form was filled in.
    pub submitted_date: NaiveDate,
    /// Raw form answers; checked against the kind's schema on create.
    pub fields: Value,
}

impl NewFormRecord {
    /// Create a new record payload.
    #[must_use]
    pub fn new(
        form_number: impl Into<String>,
        submitted_by: impl Into<String>,
        submitted_date: NaiveDate,
        fields: Value,
    ) -> Self {
        Self {
            form_number: form_number.into(),
            submitted_by: submitted_by.into(),
            submitted_date,
            fields,
        }
    }
}

/// A partial change to an existing record. `None` leaves the attribute
/// untouched.
///
/// Unknown top-level keys in a JSON update are ignored; the form number and
/// id cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecordUpdate {
    /// New submitter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    /// New submission date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_date: Option<NaiveDate>,
    /// Keys to shallow-merge into the stored fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
    /// New lifecycle marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl FormRecordUpdate {
    /// Start building an update.
    #[must_use]
    pub fn builder() -> FormRecordUpdateBuilder {
        FormRecordUpdateBuilder::default()
    }

    /// Check if the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.submitted_by.is_none()
            && self.submitted_date.is_none()
            && self.fields.is_none()
            && self.status.is_none()
    }
}

/// Builder for [`FormRecordUpdate`].
#[derive(Debug, Default)]
pub struct FormRecordUpdateBuilder(FormRecordUpdate);

impl FormRecordUpdateBuilder {
    /// Change the submitter.
    #[must_use]
    pub fn submitted_by(mut self, submitted_by: impl Into<String>) -> Self {
        self.0.submitted_by = Some(submitted_by.into());
        self
    }

    /// Change the submission date.
    #[must_use]
    pub fn submitted_date(mut self, submitted_date: NaiveDate) -> Self {
        self.0.submitted_date = Some(submitted_date);
        self
    }

    /// Merge these keys into the stored fields.
    #[must_use]
    pub fn fields(mut self, fields: Value) -> Self {
        self.0.fields = Some(fields);
        self
    }

    /// Change the lifecycle marker.
    #[must_use]
    pub fn status(mut self, status: impl Into<Status>) -> Self {
        self.0.status = Some(status.into());
        self
    }

    /// Finish the update.
    #[must_use]
    pub fn build(self) -> FormRecordUpdate {
        self.0
    }
}

/// Shallow-merge `incoming` into `existing`.
///
/// Each top-level incoming key overwrites the stored one; keys absent from
/// `incoming` are kept. Nested objects are replaced whole, never merged.
pub fn merge_fields(existing: &mut Map<String, Value>, incoming: Map<String, Value>) {
    existing.extend(incoming);
}

/// Equality filters for listing records. Filters combine with AND; empty
/// text filters are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Match this exact form number.
    pub form_number: Option<String>,
    /// Match this exact submitter.
    pub submitted_by: Option<String>,
    /// Match this submission date.
    pub submitted_date: Option<NaiveDate>,
}

impl RecordFilter {
    /// A filter matching every record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Match a form number.
    #[must_use]
    pub fn form_number(mut self, form_number: impl Into<String>) -> Self {
        self.form_number = Some(form_number.into());
        self
    }

    /// Match a submitter.
    #[must_use]
    pub fn submitted_by(mut self, submitted_by: impl Into<String>) -> Self {
        self.submitted_by = Some(submitted_by.into());
        self
    }

    /// Match a submission date.
    #[must_use]
    pub fn submitted_date(mut self, submitted_date: NaiveDate) -> Self {
        self.submitted_date = Some(submitted_date);
        self
    }
}

/// An offset/limit window over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    /// Number of matching records to skip.
    pub skip: u64,
    /// Maximum number of records to return. `None` uses the configured
    /// default; larger values are clamped to the configured maximum.
    pub limit: Option<u64>,
}

impl Page {
    /// Create a page window.
    #[must_use]
    pub fn new(skip: u64, limit: u64) -> Self {
        Self {
            skip,
            limit: Some(limit),
        }
    }
}
