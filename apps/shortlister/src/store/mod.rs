//! Record store boundary.
//!
//! The pipeline only ever talks to `dyn RecordStore`. Production wires in
//! `AirtableStore`; tests use the in-memory store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub mod airtable;
pub mod fields;
#[cfg(test)]
pub mod memory;

pub use airtable::AirtableStore;

/// Column values of a single record, keyed by the human column name.
pub type Fields = Map<String, Value>;

/// The five collections the pipeline reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Applicants,
    Details,
    WorkExperience,
    SalaryPreferences,
    Shortlist,
}

impl Table {
    /// Subtables whose rows reference an applicant through `fields::APPLICANT`.
    pub const CHILDREN: [Table; 3] = [
        Table::Details,
        Table::WorkExperience,
        Table::SalaryPreferences,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Record {
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Equality predicate on a single field; the only filter shape the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

impl Filter {
    pub fn field_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Child rows linked to the given applicant identity.
    pub fn linked_to(applicant_id: &str) -> Self {
        Self::field_equals(fields::APPLICANT, applicant_id)
    }

    /// Renders the predicate as an Airtable `filterByFormula` expression.
    pub fn to_formula(&self) -> String {
        let escaped = self.value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("IF({{{}}}=\"{}\",TRUE(),FALSE())", self.field, escaped)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("record not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, table: Table, filter: Option<&Filter>) -> Result<Vec<Record>, StoreError>;

    async fn create(&self, table: Table, fields: Fields) -> Result<Record, StoreError>;

    /// Merges `fields` into the record; columns not named are left untouched.
    async fn update(&self, table: Table, id: &str, fields: Fields) -> Result<Record, StoreError>;

    async fn batch_delete(&self, table: Table, ids: &[String]) -> Result<(), StoreError>;
}
