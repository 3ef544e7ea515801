//! Lookup of form schemas by kind name.

use serde_json::{Map, Value};
use tracing::debug;

use super::builtin::builtin_schemas;
use super::schema::FormSchema;
use crate::error::{Error, Result};

/// The set of form kinds this installation understands.
#[derive(Debug, Clone, Default)]
pub struct FormRegistry {
    schemas: Vec<FormSchema>,
}

impl FormRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in form kinds.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for schema in builtin_schemas() {
            registry.register(schema);
        }
        registry
    }

    /// Register a schema, replacing and returning any schema already
    /// registered under the same name.
    pub fn register(&mut self, schema: FormSchema) -> Option<FormSchema> {
        debug!(form = %schema.name, "Registering form schema");
        match self.schemas.iter_mut().find(|s| s.name == schema.name) {
            Some(existing) => Some(std::mem::replace(existing, schema)),
            None => {
                self.schemas.push(schema);
                None
            }
        }
    }

    /// Look up a schema by kind name.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&FormSchema> {
        self.schemas.iter().find(|s| s.name == kind)
    }

    /// Look up a schema by kind name, failing for unknown kinds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFormKind`] if no schema has that name.
    pub fn resolve(&self, kind: &str) -> Result<&FormSchema> {
        self.get(kind)
            .ok_or_else(|| Error::UnknownFormKind(kind.to_string()))
    }

    /// Validate a `fields` payload against the named kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFormKind`] for unregistered kinds and
    /// [`Error::Validation`] if the payload does not fit the schema.
    pub fn validate(&self, kind: &str, payload: &Value) -> Result<Map<String, Value>> {
        Ok(self.resolve(kind)?.validate(payload)?)
    }

    /// Registered kind names, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|s| s.name.as_str())
    }

    /// Iterate over the registered schemas.
    pub fn iter(&self) -> impl Iterator<Item = &FormSchema> {
        self.schemas.iter()
    }
}
