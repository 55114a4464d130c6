//! Canonical applicant snapshot ("Compressed JSON").
//!
//! One denormalized document per applicant joining the Personal Details,
//! Work Experience and Salary Preferences subtables. Serialized with the
//! human column names so the stored blob stays readable in the base.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub mod assembler;
pub mod change;

pub use assembler::assemble_for;
pub use change::has_changed;

pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSnapshot {
    /// Blobs written before versioning decode as version 1.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(rename = "Personal Details", default)]
    pub personal_details: Option<PersonalDetails>,
    #[serde(rename = "Work Experience", default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(rename = "Salary Preferences", default)]
    pub compensation: Option<CompensationPreference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalDetails {
    #[serde(rename = "Full Name", default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(rename = "Email", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "LinkedIn", default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(rename = "Location", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A single role. A missing `end_date` means the role is ongoing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    #[serde(rename = "Company", default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Start Date", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "End Date", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(rename = "Technologies", default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Technologies>,
}

/// Technologies as the source row held them: a multi-select list, or free
/// text in older bases. The shape is kept so it can be written back as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Technologies {
    List(Vec<String>),
    Text(String),
}

impl From<Technologies> for Value {
    fn from(technologies: Technologies) -> Self {
        match technologies {
            Technologies::List(items) => Value::from(items),
            Technologies::Text(text) => Value::String(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompensationPreference {
    #[serde(rename = "Preferred Rate", default, skip_serializing_if = "Option::is_none")]
    pub preferred_rate: Option<f64>,
    #[serde(rename = "Currency", default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(rename = "Minimum Rate", default, skip_serializing_if = "Option::is_none")]
    pub minimum_rate: Option<f64>,
    #[serde(
        rename = "Availability (hrs/week)",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub availability_hours_per_week: Option<f64>,
}

impl Default for CanonicalSnapshot {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            personal_details: None,
            work_experience: Vec::new(),
            compensation: None,
        }
    }
}

impl CanonicalSnapshot {
    /// Complete means every section has at least one source record.
    /// Incomplete snapshots are stored but never evaluated.
    pub fn is_complete(&self) -> bool {
        self.personal_details.is_some()
            && !self.work_experience.is_empty()
            && self.compensation.is_some()
    }

    /// Names of the sections that have no source record.
    pub fn missing_sections(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.personal_details.is_none() {
            missing.push("Personal Details");
        }
        if self.work_experience.is_empty() {
            missing.push("Work Experience");
        }
        if self.compensation.is_none() {
            missing.push("Salary Preferences");
        }
        missing
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Decodes the blob stored on an applicant record.
    /// Absent, blank or malformed blobs all mean "no previous snapshot".
    pub fn decode_stored(raw: Option<&str>, applicant_id: &str) -> Option<Self> {
        let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
        match Self::decode(raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Ignoring malformed stored snapshot for {applicant_id}: {e}");
                None
            }
        }
    }
}
