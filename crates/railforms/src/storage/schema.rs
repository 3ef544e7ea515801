//! `SQLite` schema definitions for railforms.
//!
//! All form kinds share one envelope table; the `kind` column tells them
//! apart, so registering a new kind needs no new table.

/// Name of the envelope table.
pub const RECORDS_TABLE: &str = "form_records";

/// SQL statement to create the form records table.
///
/// The `(kind, form_number)` constraint is what rejects duplicate business
/// keys, including between concurrent writers.
pub const CREATE_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS form_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    form_number TEXT NOT NULL,
    submitted_by TEXT NOT NULL,
    submitted_date TEXT NOT NULL,
    fields TEXT NOT NULL CHECK (json_valid(fields)),
    status TEXT NOT NULL DEFAULT 'Saved',
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (kind, form_number)
)
";

/// SQL statement to create an index for filtering by submitter.
pub const CREATE_SUBMITTED_BY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_form_records_submitted_by ON form_records(kind, submitted_by)
";

/// SQL statement to create an index for filtering by submission date.
pub const CREATE_SUBMITTED_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_form_records_submitted_date ON form_records(kind, submitted_date)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_RECORDS_TABLE,
    CREATE_SUBMITTED_BY_INDEX,
    CREATE_SUBMITTED_DATE_INDEX,
    CREATE_METADATA_TABLE,
];

/// Envelope columns in the order `Storage` decodes them.
pub const RECORD_COLUMNS: &str = "id, form_number, submitted_by, submitted_date, fields, status";
