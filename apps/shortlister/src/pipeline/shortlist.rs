use serde_json::json;
use tracing::{info, warn};

use crate::store::{fields, Fields, Filter, Record, RecordStore, StoreError, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortlistWrite {
    Created,
    Overwritten,
}

/// Creates or overwrites the single shortlist entry for an applicant.
///
/// The existing entry is found by applicant identity, not by record id,
/// so repeated runs never add a second entry.
pub async fn upsert_entry(
    store: &dyn RecordStore,
    applicant: &Record,
    applicant_id: &str,
    rationale: &str,
    snapshot_json: &str,
) -> Result<ShortlistWrite, StoreError> {
    let existing = store
        .list(Table::Shortlist, Some(&Filter::linked_to(applicant_id)))
        .await?;

    let mut entry = Fields::new();
    entry.insert(fields::APPLICANT.to_string(), json!([applicant.id]));
    entry.insert(fields::SCORE_REASON.to_string(), json!(rationale));
    entry.insert(fields::COMPRESSED_JSON.to_string(), json!(snapshot_json));

    match existing.first() {
        Some(current) => {
            if existing.len() > 1 {
                warn!(
                    "Applicant {applicant_id} has {} shortlist entries; overwriting {}",
                    existing.len(),
                    current.id
                );
            }
            store.update(Table::Shortlist, &current.id, entry).await?;
            info!("Updated {applicant_id} in shortlist");
            Ok(ShortlistWrite::Overwritten)
        }
        None => {
            store.create(Table::Shortlist, entry).await?;

            let mut status = Fields::new();
            status.insert(fields::SHORTLIST_STATUS.to_string(), json!(fields::SHORTLISTED));
            store.update(Table::Applicants, &applicant.id, status).await?;

            info!("Added {applicant_id} to shortlist");
            Ok(ShortlistWrite::Created)
        }
    }
}
