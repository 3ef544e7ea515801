//! `railforms` - Record keeping for railway maintenance forms
//!
//! This library stores inspection forms (wheel specifications, bogie
//! checksheets) in `SQLite`, validating each kind's `fields` payload against
//! its registered schema.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod forms;
pub mod logging;
pub mod record;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use forms::{FormRegistry, FormSchema, ValidationError};
pub use logging::init_logging;
pub use record::{FormRecord, FormRecordUpdate, NewFormRecord, Page, RecordFilter, Status};
pub use storage::{RecordStore, Storage, StorageStats};
