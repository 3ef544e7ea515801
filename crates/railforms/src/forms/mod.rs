//! Form schemas and payload validation.
//!
//! Every form kind stores its answers in an open `fields` mapping. A
//! [`FormSchema`] names the keys a kind requires and their primitive types;
//! validation checks those keys, normalizes them for storage (dates become
//! `YYYY-MM-DD`), and copies every other key through untouched.
//!
//! Kinds are looked up by name in a [`FormRegistry`], so adding a new form
//! means registering a schema rather than writing validation code.
//!
//! # Example
//!
//! ```
//! use railforms::forms::FormRegistry;
//! use serde_json::json;
//!
//! let registry = FormRegistry::builtin();
//! let fields = registry
//!     .validate(
//!         "bogie-checksheet",
//!         &json!({
//!             "bogieType": "EMU-TypeA",
//!             "lastCheckDate": "2025-01-15",
//!             "defectFound": "Minor crack on frame",
//!             "repairedBy": "Team B",
//!             "nextCheckDueDate": "2026-01-15",
//!             "brakeSystemStatus": "OK",
//!             "suspensionCondition": "Good",
//!             "inspector": "Shift 2"
//!         }),
//!     )
//!     .unwrap();
//!
//! assert_eq!(fields["inspector"], "Shift 2");
//! ```

mod builtin;
mod registry;
mod schema;

pub use builtin::{
    bogie_checksheet, builtin_schemas, wheel_specification, BOGIE_CHECKSHEET, WHEEL_SPECIFICATION,
};
pub use registry::FormRegistry;
pub use schema::{
    FieldIssue, FieldSpec, FieldType, FormSchema, IssueKind, ValidationError, DATE_FORMAT,
};
