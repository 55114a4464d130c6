use serde_json::Value;
use tracing::warn;

use super::{
    CanonicalSnapshot, CompensationPreference, PersonalDetails, Technologies, WorkExperience,
    SCHEMA_VERSION,
};
use crate::store::{fields, Filter, Record, RecordStore, StoreError, Table};

/// Child rows of one applicant, as returned by the store.
#[derive(Debug, Clone, Default)]
pub struct ChildRecords {
    pub details: Vec<Record>,
    pub work: Vec<Record>,
    pub salary: Vec<Record>,
}

/// Fetches the three child collections for `applicant_id` and joins them.
pub async fn assemble_for(
    store: &dyn RecordStore,
    applicant_id: &str,
) -> Result<CanonicalSnapshot, StoreError> {
    let filter = Filter::linked_to(applicant_id);
    let children = ChildRecords {
        details: store.list(Table::Details, Some(&filter)).await?,
        work: store.list(Table::WorkExperience, Some(&filter)).await?,
        salary: store.list(Table::SalaryPreferences, Some(&filter)).await?,
    };

    if children.details.len() > 1 || children.salary.len() > 1 {
        // First match wins; duplicates are shadowed, not merged.
        warn!(
            "Applicant {applicant_id} has {} detail and {} salary records; using the first of each",
            children.details.len(),
            children.salary.len()
        );
    }

    Ok(assemble(&children))
}

/// Pure join of child rows into the canonical shape. Work history keeps source order.
pub fn assemble(children: &ChildRecords) -> CanonicalSnapshot {
    CanonicalSnapshot {
        schema_version: SCHEMA_VERSION,
        personal_details: children.details.first().map(personal_details),
        work_experience: children.work.iter().map(work_experience).collect(),
        compensation: children.salary.first().map(compensation),
    }
}

fn personal_details(record: &Record) -> PersonalDetails {
    PersonalDetails {
        full_name: text_field(record, fields::FULL_NAME),
        email: text_field(record, fields::EMAIL),
        linkedin: text_field(record, fields::LINKEDIN),
        location: text_field(record, fields::LOCATION),
    }
}

fn work_experience(record: &Record) -> WorkExperience {
    WorkExperience {
        company: text_field(record, fields::COMPANY),
        title: text_field(record, fields::TITLE),
        start_date: text_field(record, fields::START),
        end_date: text_field(record, fields::END),
        technologies: technologies_field(record),
    }
}

fn compensation(record: &Record) -> CompensationPreference {
    CompensationPreference {
        preferred_rate: number_field(record, fields::PREFERRED_RATE),
        currency: text_field(record, fields::CURRENCY),
        minimum_rate: number_field(record, fields::MINIMUM_RATE),
        availability_hours_per_week: number_field(record, fields::AVAILABILITY),
    }
}

/// Text value of a column. Lookup columns come back as
/// arrays and are flattened to a comma-joined string.
fn text_field(record: &Record, name: &str) -> Option<String> {
    match record.fields.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn technologies_field(record: &Record) -> Option<Technologies> {
    match record.fields.get(fields::TECHNOLOGIES)? {
        Value::Array(items) => Some(Technologies::List(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        )),
        Value::String(s) => Some(Technologies::Text(s.clone())),
        _ => None,
    }
}

fn number_field(record: &Record, name: &str) -> Option<f64> {
    match record.fields.get(name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
