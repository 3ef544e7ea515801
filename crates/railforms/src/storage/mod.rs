//! Storage layer for railforms.
//!
//! This module provides `SQLite`-based persistence for form records. A
//! [`Storage`] owns the connection and the form registry; [`RecordStore`] is
//! a borrowed view scoped to one form kind that implements create, list,
//! get, merge-update and delete.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior,
};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::{Config, ListingConfig};
use crate::error::{Error, Result};
use crate::forms::{FieldIssue, FormRegistry, FormSchema, ValidationError, DATE_FORMAT};
use crate::record::{
    merge_fields, FormRecord, FormRecordUpdate, NewFormRecord, Page, RecordFilter, Status,
};

use schema::RECORD_COLUMNS;

/// Storage engine for form records.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
    /// Known form kinds.
    registry: FormRegistry,
    /// Pagination limits.
    listing: ListingConfig,
}

impl Storage {
    /// Open an existing, migrated database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaNotInitialized`] if the file does not exist or
    /// was never migrated, [`Error::SchemaVersionMismatch`] if it was
    /// migrated by a different version, or an error if it cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(Error::SchemaNotInitialized { path });
        }

        let conn = Self::connect(&path)?;
        migrations::ensure_current(&conn, &path)?;

        debug!("Database opened at {}", path.display());
        Ok(Self::with_connection(path, conn))
    }

    /// Open or create a database file and bring its schema up to date.
    ///
    /// This is the deployment-time setup step; request handling should use
    /// [`Storage::open`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or migrated.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Self::connect(&path)?;
        migrations::migrate(&conn)?;

        info!("Database ready at {}", path.display());
        Ok(Self::with_connection(path, conn))
    }

    /// Open the database configured in `config`, applying its busy timeout
    /// and listing limits.
    ///
    /// # Errors
    ///
    /// See [`Storage::open`].
    pub fn open_with_config(config: &Config) -> Result<Self> {
        Self::open(config.database_path())?.configured(config)
    }

    /// Create or migrate the database configured in `config`.
    ///
    /// # Errors
    ///
    /// See [`Storage::create`].
    pub fn create_with_config(config: &Config) -> Result<Self> {
        Self::create(config.database_path())?.configured(config)
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::migrate(&conn)?;

        Ok(Self::with_connection(PathBuf::from(":memory:"), conn))
    }

    fn connect(path: &Path) -> Result<Connection> {
        debug!("Opening database at {}", path.display());
        let conn = Connection::open(path).map_err(|source| Error::DatabaseOpen {
            path: path.to_path_buf(),
            source,
        })?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Ok(conn)
    }

    fn with_connection(path: PathBuf, conn: Connection) -> Self {
        Self {
            path,
            conn,
            registry: FormRegistry::builtin(),
            listing: ListingConfig::default(),
        }
    }

    fn configured(self, config: &Config) -> Result<Self> {
        Ok(self
            .with_busy_timeout(config.busy_timeout())?
            .with_listing(config.listing))
    }

    /// Set how long writers wait on a locked database.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` rejects the setting.
    pub fn with_busy_timeout(self, timeout: Duration) -> Result<Self> {
        self.conn.busy_timeout(timeout)?;
        Ok(self)
    }

    /// Replace the pagination limits.
    #[must_use]
    pub fn with_listing(mut self, listing: ListingConfig) -> Self {
        self.listing = listing;
        self
    }

    /// Replace the form registry.
    #[must_use]
    pub fn with_registry(mut self, registry: FormRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the form registry.
    #[must_use]
    pub fn registry(&self) -> &FormRegistry {
        &self.registry
    }

    /// Get the schema version recorded in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn schema_version(&self) -> Result<Option<i32>> {
        migrations::schema_version(&self.conn)
    }

    /// Get a record store for one form kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFormKind`] if the kind is not registered.
    pub fn records(&self, kind: &str) -> Result<RecordStore<'_>> {
        Ok(RecordStore {
            conn: &self.conn,
            schema: self.registry.resolve(kind)?,
            listing: self.listing,
        })
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let mut records_by_kind = Vec::new();
        for kind in self.registry.kinds() {
            records_by_kind.push((kind.to_string(), self.records(kind)?.count()?));
        }

        let total_records: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM form_records", [], |row| row.get(0))?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            schema_version: self.schema_version()?,
            total_records,
            records_by_kind,
            db_size_bytes,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Schema version recorded in the database.
    pub schema_version: Option<i32>,
    /// Total number of records of every kind, registered or not.
    pub total_records: i64,
    /// Record count per registered kind, in registration order.
    pub records_by_kind: Vec<(String, i64)>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Persistence for one form kind's records.
///
/// Every write is a single `SQLite` statement or transaction, so a failed
/// operation never leaves a partially applied change behind.
#[derive(Debug, Clone, Copy)]
pub struct RecordStore<'a> {
    conn: &'a Connection,
    schema: &'a FormSchema,
    listing: ListingConfig,
}

impl<'a> RecordStore<'a> {
    /// The form kind this store manages.
    #[must_use]
    pub fn kind(&self) -> &'a str {
        &self.schema.name
    }

    /// The schema records of this kind are validated against.
    #[must_use]
    pub fn schema(&self) -> &'a FormSchema {
        self.schema
    }

    /// Create a record. The status is always `Saved`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the form number is blank or the
    /// fields do not fit the schema, [`Error::Conflict`] if the form number
    /// is already taken for this kind, or an error if the database operation
    /// fails.
    pub fn create(&self, record: &NewFormRecord) -> Result<FormRecord> {
        if record.form_number.trim().is_empty() {
            let issues = vec![FieldIssue::blank("formNumber")];
            return Err(ValidationError::new(self.kind(), issues).into());
        }
        let fields = self.schema.validate(&record.fields)?;
        let status = Status::Saved;

        let result = self.conn.execute(
            r"
            INSERT INTO form_records (kind, form_number, submitted_by, submitted_date, fields, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                self.kind(),
                record.form_number,
                record.submitted_by,
                format_date(record.submitted_date),
                serde_json::to_string(&fields)?,
                status.as_str(),
            ],
        );

        match result {
            Ok(_) => {}
            Err(ref e) if is_unique_violation(e) => {
                warn!(
                    form = %self.kind(),
                    form_number = %record.form_number,
                    "Rejected duplicate form number"
                );
                return Err(Error::conflict(self.kind(), &record.form_number));
            }
            Err(e) => return Err(e.into()),
        }

        let id = self.conn.last_insert_rowid();
        debug!(form = %self.kind(), id, "Created record");

        Ok(FormRecord {
            id,
            form_number: record.form_number.clone(),
            submitted_by: record.submitted_by.clone(),
            submitted_date: record.submitted_date,
            fields,
            status,
        })
    }

    /// List records matching `filter`, in insertion order, within `page`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a stored row
    /// cannot be decoded.
    pub fn list(&self, filter: &RecordFilter, page: Page) -> Result<Vec<FormRecord>> {
        let mut clauses = vec!["kind = ?1".to_string()];
        let mut values = vec![SqlValue::Text(self.kind().to_string())];

        let mut push = |column: &str, value: SqlValue| {
            values.push(value);
            clauses.push(format!("{column} = ?{}", values.len()));
        };
        if let Some(form_number) = non_empty(filter.form_number.as_deref()) {
            push("form_number", SqlValue::Text(form_number.to_string()));
        }
        if let Some(submitted_by) = non_empty(filter.submitted_by.as_deref()) {
            push("submitted_by", SqlValue::Text(submitted_by.to_string()));
        }
        if let Some(date) = filter.submitted_date {
            push("submitted_date", SqlValue::Text(format_date(date)));
        }

        let limit = self.listing.window(page.limit);
        values.push(SqlValue::Integer(to_i64(limit)));
        values.push(SqlValue::Integer(to_i64(page.skip)));
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM form_records WHERE {} ORDER BY id ASC LIMIT ?{} OFFSET ?{}",
            clauses.join(" AND "),
            values.len() - 1,
            values.len(),
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), StoredRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            form = %self.kind(),
            matched = rows.len(),
            skip = page.skip,
            limit,
            "Listed records"
        );
        rows.into_iter().map(StoredRow::decode).collect()
    }

    /// Get a record by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored row
    /// cannot be decoded.
    pub fn get(&self, id: i64) -> Result<Option<FormRecord>> {
        fetch(self.conn, self.kind(), id)
    }

    /// Apply a partial update.
    ///
    /// Incoming `fields` are validated and shallow-merged into the stored
    /// ones; other attributes are overwritten. Returns `None` if no record
    /// of this kind has that id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before touching the database if the
    /// incoming fields or status are invalid, or an error if the database
    /// operation fails.
    pub fn update(&self, id: i64, update: &FormRecordUpdate) -> Result<Option<FormRecord>> {
        let incoming = update
            .fields
            .as_ref()
            .map(|fields| self.schema.validate(fields))
            .transpose()?;
        if update.status.as_ref().is_some_and(Status::is_blank) {
            let issues = vec![FieldIssue::blank("status")];
            return Err(ValidationError::new(self.kind(), issues).into());
        }

        if update.is_empty() {
            return self.get(id);
        }

        // IMMEDIATE takes the write lock before the read, so concurrent
        // updates of one record serialize instead of losing a merge.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(mut record) = fetch(&tx, self.kind(), id)? else {
            debug!(form = %self.kind(), id, "Update target not found");
            return Ok(None);
        };

        if let Some(incoming) = incoming {
            merge_fields(&mut record.fields, incoming);
        }
        if let Some(submitted_by) = &update.submitted_by {
            record.submitted_by.clone_from(submitted_by);
        }
        if let Some(submitted_date) = update.submitted_date {
            record.submitted_date = submitted_date;
        }
        if let Some(status) = &update.status {
            record.status = status.clone();
        }

        tx.execute(
            r"
            UPDATE form_records
            SET submitted_by = ?1, submitted_date = ?2, fields = ?3, status = ?4
            WHERE id = ?5 AND kind = ?6
            ",
            params![
                record.submitted_by,
                format_date(record.submitted_date),
                serde_json::to_string(&record.fields)?,
                record.status.as_str(),
                id,
                self.kind(),
            ],
        )?;
        tx.commit()?;

        debug!(form = %self.kind(), id, "Updated record");
        Ok(Some(record))
    }

    /// Delete a record by id.
    ///
    /// Returns `true` if a record was deleted, `false` if there was nothing
    /// to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM form_records WHERE id = ?1 AND kind = ?2",
            params![id, self.kind()],
        )?;

        if affected > 0 {
            info!(form = %self.kind(), id, "Deleted record");
        }
        Ok(affected > 0)
    }

    /// Count records of this kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM form_records WHERE kind = ?1",
            [self.kind()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn fetch(conn: &Connection, kind: &str, id: i64) -> Result<Option<FormRecord>> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM form_records WHERE id = ?1 AND kind = ?2"),
        params![id, kind],
        StoredRow::from_row,
    )
    .optional()?
    .map(StoredRow::decode)
    .transpose()
}

/// A row as `SQLite` returns it, before dates and JSON are decoded.
struct StoredRow {
    id: i64,
    form_number: String,
    submitted_by: String,
    submitted_date: String,
    fields: String,
    status: String,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            form_number: row.get(1)?,
            submitted_by: row.get(2)?,
            submitted_date: row.get(3)?,
            fields: row.get(4)?,
            status: row.get(5)?,
        })
    }

    fn decode(self) -> Result<FormRecord> {
        let submitted_date = NaiveDate::parse_from_str(&self.submitted_date, DATE_FORMAT)
            .map_err(|e| Error::CorruptRecord {
                id: self.id,
                message: format!("submitted_date '{}': {e}", self.submitted_date),
            })?;
        let fields: Map<String, Value> =
            serde_json::from_str(&self.fields).map_err(|e| Error::CorruptRecord {
                id: self.id,
                message: format!("fields: {e}"),
            })?;

        Ok(FormRecord {
            id: self.id,
            form_number: self.form_number,
            submitted_by: self.submitted_by,
            submitted_date,
            fields,
            status: Status::from(self.status),
        })
    }
}

/// Only a UNIQUE failure means a duplicate business key; NOT NULL and CHECK
/// failures are reported as plain query errors.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FieldType, BOGIE_CHECKSHEET, WHEEL_SPECIFICATION};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn create_test_storage() -> Storage {
        crate::logging::init_test_logging();
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn bogie_fields() -> Value {
        json!({
            "bogieType": "EMU-TypeA",
            "lastCheckDate": "2025-01-15",
            "defectFound": "Minor crack on frame",
            "repairedBy": "Team B",
            "nextCheckDueDate": "2026-01-15",
            "brakeSystemStatus": "OK",
            "suspensionCondition": "Good",
            "additionalNotes": "No major issues noted."
        })
    }

    fn wheel_fields() -> Value {
        json!({
            "treadDiameterNew": "915 (900-1000)",
            "lastShopIssueSize": "837 (800-900)",
            "condemningDia": "825 (800-900)",
            "wheelGauge": "1600 (+2,-1)",
            "variationSameAxle": "0.5",
            "variationSameBogie": "5",
            "variationSameCoach": "13",
            "wheelProfile": "29.4 Flange Thickness",
            "intermediateWWP": "20 TO 28",
            "bearingSeatDiameter": "130.043 TO 130.068",
            "rollerBearingOuterDia": "280 (+0.0/-0.035)",
            "rollerBearingBoreDia": "130 (+0.0/-0.025)",
            "rollerBearingWidth": "93 (+0/-0.250)",
            "axleBoxHousingBoreDia": "280 (+0.030/+0.052)",
            "wheelDiscWidth": "127 (+4/-0)"
        })
    }

    fn bogie(form_number: &str) -> NewFormRecord {
        NewFormRecord::new(form_number, "Supervisor C", date("2025-07-25"), bogie_fields())
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_records_unknown_kind() {
        let storage = create_test_storage();
        let err = storage.records("axle-log").unwrap_err();
        assert!(matches!(err, Error::UnknownFormKind(_)));
    }

    #[test]
    fn test_create_assigns_distinct_ids_and_saved_status() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();

        let first = store.create(&bogie("BCS-001")).unwrap();
        let second = store.create(&bogie("BCS-002")).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, Status::Saved);
        assert_eq!(second.status, Status::Saved);
    }

    #[test]
    fn test_create_then_get_round_trips() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();

        let created = store.create(&bogie("BCS-001")).unwrap();
        let fetched = store.get(created.id).unwrap().unwrap();

        assert_eq!(fetched, created);
        assert_eq!(
            serde_json::to_value(&fetched).unwrap(),
            json!({
                "id": created.id,
                "formNumber": "BCS-001",
                "submittedBy": "Supervisor C",
                "submittedDate": "2025-07-25",
                "fields": bogie_fields(),
                "status": "Saved"
            })
        );
    }

    #[test]
    fn test_create_duplicate_form_number_conflicts() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();

        store.create(&bogie("BCS-001")).unwrap();
        let err = store.create(&bogie("BCS-001")).unwrap_err();

        assert!(err.is_conflict());
        let matching = store
            .list(&RecordFilter::all().form_number("BCS-001"), Page::default())
            .unwrap();
        assert_eq!(matching.len(), 1);
    }

    #[test]
    fn test_uniqueness_applies_to_every_kind() {
        let storage = create_test_storage();
        let store = storage.records(WHEEL_SPECIFICATION).unwrap();
        let record = NewFormRecord::new("WS-001", "Ajeet Kumar", date("2025-07-25"), wheel_fields());

        store.create(&record).unwrap();
        assert!(store.create(&record).unwrap_err().is_conflict());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_same_form_number_in_different_kinds() {
        let storage = create_test_storage();
        let wheels = storage.records(WHEEL_SPECIFICATION).unwrap();
        let bogies = storage.records(BOGIE_CHECKSHEET).unwrap();

        wheels
            .create(&NewFormRecord::new("F-1", "A", date("2025-07-25"), wheel_fields()))
            .unwrap();
        bogies.create(&bogie("F-1")).unwrap();

        assert_eq!(wheels.count().unwrap(), 1);
        assert_eq!(bogies.count().unwrap(), 1);
    }

    #[test]
    fn test_create_rejects_invalid_fields_without_writing() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();

        let mut fields = bogie_fields();
        fields["lastCheckDate"] = json!("15/01/2025");
        fields.as_object_mut().unwrap().remove("bogieType");
        let record = NewFormRecord::new("BCS-001", "Supervisor C", date("2025-07-25"), fields);

        let err = store.create(&record).unwrap_err();
        let Error::Validation(validation) = err else {
            panic!("expected validation error, got {err}");
        };
        assert_eq!(validation.issues.len(), 2);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_create_rejects_blank_form_number() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();

        let err = store.create(&bogie("  ")).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("formNumber"));
    }

    #[test]
    fn test_create_normalizes_dates() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();

        let mut fields = bogie_fields();
        fields["nextCheckDueDate"] = json!(" 2026-01-15 ");
        let created = store
            .create(&NewFormRecord::new("BCS-001", "C", date("2025-07-25"), fields))
            .unwrap();

        let fetched = store.get(created.id).unwrap().unwrap();
        assert_eq!(fetched.fields["nextCheckDueDate"], "2026-01-15");
    }

    #[test]
    fn test_extra_keys_preserved() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();

        let mut fields = bogie_fields();
        fields["additionalProp1"] = json!({"axles": [1, 2], "note": "unicode ✓ 世界"});
        fields["inspectorBadge"] = json!(4471);
        fields["photos"] = json!(["a.jpg", "b.jpg"]);
        let created = store
            .create(&NewFormRecord::new("BCS-001", "C", date("2025-07-25"), fields.clone()))
            .unwrap();

        let fetched = store.get(created.id).unwrap().unwrap();
        assert_eq!(Value::Object(fetched.fields.clone()), fields);
        let keys: Vec<&String> = fetched.fields.keys().collect();
        let expected: Vec<&String> = fields.as_object().unwrap().keys().collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_extra_numbers_preserved_exactly() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();

        let mut fields = bogie_fields();
        fields["serial"] = serde_json::from_str("123456789012345678901234567890").unwrap();
        fields["ratio"] = serde_json::from_str("1.10").unwrap();
        fields["tolerance"] = serde_json::from_str("-0.0250").unwrap();
        let created = store
            .create(&NewFormRecord::new("BCS-001", "C", date("2025-07-25"), fields))
            .unwrap();

        let fetched = store.get(created.id).unwrap().unwrap();
        assert_eq!(
            serde_json::to_string(&fetched.fields["serial"]).unwrap(),
            "123456789012345678901234567890"
        );
        assert_eq!(serde_json::to_string(&fetched.fields["ratio"]).unwrap(), "1.10");
        assert_eq!(
            serde_json::to_string(&fetched.fields["tolerance"]).unwrap(),
            "-0.0250"
        );

        // A merge-update rewrites the column; untouched numbers survive it.
        let update = FormRecordUpdate::builder().fields(bogie_fields()).build();
        let updated = store.update(created.id, &update).unwrap().unwrap();
        assert_eq!(
            serde_json::to_string(&updated.fields["serial"]).unwrap(),
            "123456789012345678901234567890"
        );
        let reread = store.get(created.id).unwrap().unwrap();
        assert_eq!(serde_json::to_string(&reread.fields["ratio"]).unwrap(), "1.10");
    }

    #[test]
    fn test_only_unique_violations_are_conflicts() {
        let storage = create_test_storage();
        let insert = "INSERT INTO form_records (kind, form_number, submitted_by, submitted_date, fields) \
                      VALUES ('bogie-checksheet', ?1, 'C', '2025-07-25', ?2)";

        storage.conn.execute(insert, ["BCS-001", "{}"]).unwrap();
        let duplicate = storage.conn.execute(insert, ["BCS-001", "{}"]).unwrap_err();
        assert!(is_unique_violation(&duplicate));

        let bad_json = storage.conn.execute(insert, ["BCS-002", "not json"]).unwrap_err();
        assert!(!is_unique_violation(&bad_json));

        let missing = storage
            .conn
            .execute(
                "INSERT INTO form_records (kind, form_number, submitted_by, submitted_date, fields) \
                 VALUES ('bogie-checksheet', 'BCS-003', NULL, '2025-07-25', '{}')",
                [],
            )
            .unwrap_err();
        assert!(!is_unique_violation(&missing));
    }

    #[test]
    fn test_get_nonexistent() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        assert!(store.get(99_999).unwrap().is_none());
    }

    #[test]
    fn test_get_is_scoped_to_kind() {
        let storage = create_test_storage();
        let created = storage
            .records(BOGIE_CHECKSHEET)
            .unwrap()
            .create(&bogie("BCS-001"))
            .unwrap();

        let wheels = storage.records(WHEEL_SPECIFICATION).unwrap();
        assert!(wheels.get(created.id).unwrap().is_none());
        assert!(!wheels.delete(created.id).unwrap());
    }

    #[test]
    fn test_list_filter_by_form_number() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        for n in 1..=3 {
            store.create(&bogie(&format!("BCS-00{n}"))).unwrap();
        }

        let results = store
            .list(&RecordFilter::all().form_number("BCS-002"), Page::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].form_number, "BCS-002");
    }

    #[test]
    fn test_list_filters_combine_with_and() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();

        let submissions = [
            ("BCS-001", "Supervisor A", "2025-07-25"),
            ("BCS-002", "Supervisor A", "2025-07-26"),
            ("BCS-003", "Supervisor B", "2025-07-25"),
        ];
        for (number, by, on) in submissions {
            store
                .create(&NewFormRecord::new(number, by, date(on), bogie_fields()))
                .unwrap();
        }

        let by_a = store
            .list(&RecordFilter::all().submitted_by("Supervisor A"), Page::default())
            .unwrap();
        assert_eq!(by_a.len(), 2);

        let on_25th = store
            .list(
                &RecordFilter::all().submitted_date(date("2025-07-25")),
                Page::default(),
            )
            .unwrap();
        assert_eq!(on_25th.len(), 2);

        let both = store
            .list(
                &RecordFilter::all()
                    .submitted_by("Supervisor A")
                    .submitted_date(date("2025-07-25")),
                Page::default(),
            )
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].form_number, "BCS-001");
    }

    #[test]
    fn test_list_ignores_empty_text_filters() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        store.create(&bogie("BCS-001")).unwrap();

        let results = store
            .list(
                &RecordFilter::all().form_number("").submitted_by(""),
                Page::default(),
            )
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_list_empty_results() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        store.create(&bogie("BCS-001")).unwrap();

        let results = store
            .list(&RecordFilter::all().form_number("missing"), Page::default())
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_list_pagination() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        for n in 1..=3 {
            store.create(&bogie(&format!("BCS-00{n}"))).unwrap();
        }

        let first = store.list(&RecordFilter::all(), Page::new(0, 1)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].form_number, "BCS-001");

        let last = store.list(&RecordFilter::all(), Page::new(2, 1)).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].form_number, "BCS-003");

        let past_end = store.list(&RecordFilter::all(), Page::new(3, 1)).unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_list_limit_clamped_to_cap() {
        let storage = create_test_storage().with_listing(ListingConfig {
            default_limit: 2,
            max_limit: 3,
        });
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        for n in 1..=5 {
            store.create(&bogie(&format!("BCS-00{n}"))).unwrap();
        }

        let default_window = store.list(&RecordFilter::all(), Page::default()).unwrap();
        assert_eq!(default_window.len(), 2);

        let clamped = store.list(&RecordFilter::all(), Page::new(0, 1_000)).unwrap();
        assert_eq!(clamped.len(), 3);
    }

    #[test]
    fn test_list_default_window_is_hundred() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        for n in 0..105 {
            store.create(&bogie(&format!("BCS-{n:03}"))).unwrap();
        }

        assert_eq!(store.list(&RecordFilter::all(), Page::default()).unwrap().len(), 100);
        assert_eq!(store.list(&RecordFilter::all(), Page::new(0, 500)).unwrap().len(), 100);
        assert_eq!(store.list(&RecordFilter::all(), Page::new(100, 100)).unwrap().len(), 5);
    }

    #[test]
    fn test_update_shallow_merges_fields() {
        let mut registry = FormRegistry::builtin();
        registry.register(FormSchema::new("scratch", "Scratch").required("a", FieldType::Text));
        let storage = create_test_storage().with_registry(registry);
        let store = storage.records("scratch").unwrap();

        let created = store
            .create(&NewFormRecord::new("S-1", "A", date("2025-07-25"), json!({"a": "1", "b": "2"})))
            .unwrap();

        // Incoming fields still need the schema's required keys.
        let partial = FormRecordUpdate::builder().fields(json!({"b": "3"})).build();
        assert!(store.update(created.id, &partial).unwrap_err().is_validation());

        let update = FormRecordUpdate::builder()
            .fields(json!({"a": "1", "b": "3", "c": "4"}))
            .build();
        let updated = store.update(created.id, &update).unwrap().unwrap();
        assert_eq!(
            Value::Object(updated.fields),
            json!({"a": "1", "b": "3", "c": "4"})
        );
    }

    #[test]
    fn test_update_keeps_untouched_keys() {
        let mut registry = FormRegistry::new();
        registry.register(FormSchema::new("loose", "Loose"));
        let storage = create_test_storage().with_registry(registry);
        let store = storage.records("loose").unwrap();

        let created = store
            .create(&NewFormRecord::new("L-1", "A", date("2025-07-25"), json!({"a": "1", "b": "2"})))
            .unwrap();
        let update = FormRecordUpdate::builder().fields(json!({"b": "3", "c": "4"})).build();
        store.update(created.id, &update).unwrap();

        let stored = store.get(created.id).unwrap().unwrap();
        assert_eq!(stored.fields, as_map(json!({"a": "1", "b": "3", "c": "4"})));
    }

    #[test]
    fn test_update_replaces_nested_objects() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();

        let mut fields = bogie_fields();
        fields["additionalProp1"] = json!({"x": 1, "y": 2});
        let created = store
            .create(&NewFormRecord::new("BCS-001", "C", date("2025-07-25"), fields))
            .unwrap();

        let mut incoming = bogie_fields();
        incoming["additionalProp1"] = json!({"y": 3});
        let update = FormRecordUpdate::builder().fields(incoming).build();
        let updated = store.update(created.id, &update).unwrap().unwrap();

        assert_eq!(updated.fields["additionalProp1"], json!({"y": 3}));
    }

    #[test]
    fn test_update_top_level_attributes() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        let created = store.create(&bogie("BCS-001")).unwrap();

        let update = FormRecordUpdate::builder()
            .submitted_by("Updated Supervisor C")
            .submitted_date(date("2025-08-01"))
            .status("Approved")
            .build();
        let updated = store.update(created.id, &update).unwrap().unwrap();

        assert_eq!(updated.submitted_by, "Updated Supervisor C");
        assert_eq!(updated.submitted_date, date("2025-08-01"));
        assert_eq!(updated.status, Status::Approved);
        assert_eq!(updated.fields, created.fields);
        assert_eq!(updated.form_number, "BCS-001");
        assert_eq!(store.get(created.id).unwrap().unwrap(), updated);
    }

    #[test]
    fn test_update_accepts_open_status_values() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        let created = store.create(&bogie("BCS-001")).unwrap();

        let update = FormRecordUpdate::builder().status("Sent to shop").build();
        store.update(created.id, &update).unwrap();

        let stored = store.get(created.id).unwrap().unwrap();
        assert_eq!(stored.status, Status::Other("Sent to shop".to_string()));
    }

    #[test]
    fn test_update_rejects_blank_status() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        let created = store.create(&bogie("BCS-001")).unwrap();

        let update = FormRecordUpdate::builder().status("").build();
        assert!(store.update(created.id, &update).unwrap_err().is_validation());
        assert_eq!(store.get(created.id).unwrap().unwrap().status, Status::Saved);
    }

    #[test]
    fn test_update_invalid_fields_leaves_record_untouched() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        let created = store.create(&bogie("BCS-001")).unwrap();

        let mut incoming = bogie_fields();
        incoming["lastCheckDate"] = json!("not a date");
        let update = FormRecordUpdate::builder()
            .submitted_by("Someone else")
            .fields(incoming)
            .build();

        assert!(store.update(created.id, &update).unwrap_err().is_validation());
        assert_eq!(store.get(created.id).unwrap().unwrap(), created);
    }

    #[test]
    fn test_update_nonexistent_leaves_store_unchanged() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        let created = store.create(&bogie("BCS-001")).unwrap();
        let before = store.list(&RecordFilter::all(), Page::default()).unwrap();

        let update = FormRecordUpdate::builder().status("Approved").build();
        assert!(store.update(99_999, &update).unwrap().is_none());

        let after = store.list(&RecordFilter::all(), Page::default()).unwrap();
        assert_eq!(before, after);
        assert_eq!(store.get(created.id).unwrap().unwrap().status, Status::Saved);
    }

    #[test]
    fn test_empty_update_returns_current_record() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        let created = store.create(&bogie("BCS-001")).unwrap();

        let unchanged = store.update(created.id, &FormRecordUpdate::default()).unwrap();
        assert_eq!(unchanged, Some(created));
        assert!(store.update(99_999, &FormRecordUpdate::default()).unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        let created = store.create(&bogie("BCS-001")).unwrap();

        assert!(store.delete(created.id).unwrap());
        assert!(store.get(created.id).unwrap().is_none());
        assert!(!store.delete(created.id).unwrap());
    }

    #[test]
    fn test_delete_frees_form_number() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        let created = store.create(&bogie("BCS-001")).unwrap();

        store.delete(created.id).unwrap();
        let recreated = store.create(&bogie("BCS-001")).unwrap();
        assert_ne!(recreated.id, created.id);
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let storage = create_test_storage();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        let created = store.create(&bogie("BCS-001")).unwrap();

        storage
            .conn
            .execute(
                "UPDATE form_records SET submitted_date = 'someday' WHERE id = ?1",
                [created.id],
            )
            .unwrap();

        let err = store.get(created.id).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { id, .. } if id == created.id));
    }

    #[test]
    fn test_stats() {
        let storage = create_test_storage();
        storage
            .records(BOGIE_CHECKSHEET)
            .unwrap()
            .create(&bogie("BCS-001"))
            .unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.schema_version, Some(migrations::CURRENT_VERSION));
        assert_eq!(stats.total_records, 1);
        assert_eq!(
            stats.records_by_kind,
            vec![
                (WHEEL_SPECIFICATION.to_string(), 0),
                (BOGIE_CHECKSHEET.to_string(), 1)
            ]
        );
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_open_requires_migration() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("forms.db");

        let err = Storage::open(&db_path).unwrap_err();
        assert!(matches!(err, Error::SchemaNotInitialized { .. }));
        assert!(!db_path.exists());

        // A file that exists but was never migrated is rejected too.
        Connection::open(&db_path).unwrap();
        let err = Storage::open(&db_path).unwrap_err();
        assert!(matches!(err, Error::SchemaNotInitialized { .. }));
    }

    #[test]
    fn test_create_then_open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("forms.db");

        let storage = Storage::create(&db_path).unwrap();
        storage
            .records(BOGIE_CHECKSHEET)
            .unwrap()
            .create(&bogie("BCS-001"))
            .unwrap();
        assert_eq!(storage.path(), db_path);
        drop(storage);

        let reopened = Storage::open(&db_path).unwrap();
        let store = reopened.records(BOGIE_CHECKSHEET).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        // Re-running the setup step keeps existing data.
        drop(reopened);
        let migrated_again = Storage::create(&db_path).unwrap();
        assert_eq!(migrated_again.records(BOGIE_CHECKSHEET).unwrap().count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_rejected_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("forms.db");
        Storage::create(&db_path).unwrap();

        let first = Storage::open(&db_path).unwrap();
        let second = Storage::open(&db_path).unwrap();

        first
            .records(BOGIE_CHECKSHEET)
            .unwrap()
            .create(&bogie("BCS-001"))
            .unwrap();
        let err = second
            .records(BOGIE_CHECKSHEET)
            .unwrap()
            .create(&bogie("BCS-001"))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_open_with_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database_path = Some(dir.path().join("forms.db"));
        config.listing = ListingConfig {
            default_limit: 1,
            max_limit: 2,
        };

        Storage::create_with_config(&config).unwrap();
        let storage = Storage::open_with_config(&config).unwrap();
        let store = storage.records(BOGIE_CHECKSHEET).unwrap();
        for n in 1..=3 {
            store.create(&bogie(&format!("BCS-00{n}"))).unwrap();
        }

        assert_eq!(store.list(&RecordFilter::all(), Page::default()).unwrap().len(), 1);
        assert_eq!(store.list(&RecordFilter::all(), Page::new(0, 10)).unwrap().len(), 2);
    }
}
