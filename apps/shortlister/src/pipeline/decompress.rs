use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{PipelineError, SkipReason};
use crate::snapshot::{CanonicalSnapshot, CompensationPreference, PersonalDetails, WorkExperience};
use crate::store::{fields, Fields, Filter, Record, RecordStore, StoreError, Table};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecompressOutcome {
    Restored { work_entries: usize },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DecompressedApplicant {
    pub applicant_id: String,
    #[serde(flatten)]
    pub outcome: DecompressOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecompressReport {
    pub run_id: Uuid,
    pub restored: usize,
    pub skipped: usize,
    pub failed: usize,
    pub applicants: Vec<DecompressedApplicant>,
}

impl DecompressReport {
    fn record(&mut self, applicant_id: String, outcome: DecompressOutcome) {
        match &outcome {
            DecompressOutcome::Restored { .. } => self.restored += 1,
            DecompressOutcome::Skipped { .. } => self.skipped += 1,
            DecompressOutcome::Failed { .. } => self.failed += 1,
        }
        self.applicants.push(DecompressedApplicant {
            applicant_id,
            outcome,
        });
    }
}

/// Rebuilds the three subtables of every applicant from its stored snapshot.
pub struct Decompressor<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> Decompressor<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    pub async fn run(&self) -> Result<DecompressReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("decompress_run", %run_id);

        async move {
            let applicants = self
                .store
                .list(Table::Applicants, None)
                .await
                .map_err(PipelineError::ListApplicants)?;
            info!("Decompressing {} applicants", applicants.len());

            let mut report = DecompressReport {
                run_id,
                restored: 0,
                skipped: 0,
                failed: 0,
                applicants: Vec::new(),
            };

            for applicant in &applicants {
                let Some(applicant_id) = applicant
                    .str_field(fields::APPLICANT_ID)
                    .filter(|id| !id.trim().is_empty())
                    .map(str::to_string)
                else {
                    warn!("Skipping record {} without an Applicant ID", applicant.id);
                    report.record(
                        applicant.id.clone(),
                        DecompressOutcome::Skipped {
                            reason: SkipReason::MissingApplicantId,
                        },
                    );
                    continue;
                };

                let Some(snapshot) = CanonicalSnapshot::decode_stored(
                    applicant.str_field(fields::COMPRESSED_JSON),
                    &applicant_id,
                ) else {
                    info!("No usable snapshot stored for {applicant_id}");
                    report.record(
                        applicant_id,
                        DecompressOutcome::Skipped {
                            reason: SkipReason::InvalidData {
                                detail: "no stored snapshot".to_string(),
                            },
                        },
                    );
                    continue;
                };

                let outcome = self
                    .restore(applicant, &applicant_id, &snapshot)
                    .instrument(info_span!("applicant", %applicant_id))
                    .await
                    .map(|work_entries| DecompressOutcome::Restored { work_entries })
                    .unwrap_or_else(|e| {
                        error!("Error decompressing applicant {applicant_id}: {e}");
                        DecompressOutcome::Failed {
                            error: e.to_string(),
                        }
                    });
                report.record(applicant_id, outcome);
            }

            info!(
                "Decompress complete: {} restored, {} skipped, {} failed",
                report.restored, report.skipped, report.failed
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn restore(
        &self,
        applicant: &Record,
        applicant_id: &str,
        snapshot: &CanonicalSnapshot,
    ) -> Result<usize, StoreError> {
        let filter = Filter::linked_to(applicant_id);
        for table in Table::CHILDREN {
            let stale: Vec<String> = self
                .store
                .list(table, Some(&filter))
                .await?
                .into_iter()
                .map(|r| r.id)
                .collect();
            if !stale.is_empty() {
                self.store.batch_delete(table, &stale).await?;
            }
        }

        if let Some(details) = &snapshot.personal_details {
            self.store
                .create(Table::Details, details_fields(&applicant.id, details))
                .await?;
        }
        for work in &snapshot.work_experience {
            self.store
                .create(Table::WorkExperience, work_fields(&applicant.id, work))
                .await?;
        }
        if let Some(compensation) = &snapshot.compensation {
            self.store
                .create(
                    Table::SalaryPreferences,
                    salary_fields(&applicant.id, compensation),
                )
                .await?;
        }

        info!("Restored subtables for {applicant_id}");
        Ok(snapshot.work_experience.len())
    }
}

fn linked(record_id: &str) -> Fields {
    let mut f = Fields::new();
    f.insert(fields::APPLICANT.to_string(), json!([record_id]));
    f
}

/// Absent values are left out rather than written as nulls.
fn put<T: Into<Value>>(f: &mut Fields, name: &str, value: Option<T>) {
    if let Some(value) = value {
        f.insert(name.to_string(), value.into());
    }
}

fn details_fields(record_id: &str, details: &PersonalDetails) -> Fields {
    let mut f = linked(record_id);
    put(&mut f, fields::FULL_NAME, details.full_name.clone());
    put(&mut f, fields::EMAIL, details.email.clone());
    put(&mut f, fields::LINKEDIN, details.linkedin.clone());
    put(&mut f, fields::LOCATION, details.location.clone());
    f
}

fn work_fields(record_id: &str, work: &WorkExperience) -> Fields {
    let mut f = linked(record_id);
    put(&mut f, fields::COMPANY, work.company.clone());
    put(&mut f, fields::TITLE, work.title.clone());
    put(&mut f, fields::START, work.start_date.clone());
    put(&mut f, fields::END, work.end_date.clone());
    put(&mut f, fields::TECHNOLOGIES, work.technologies.clone());
    f
}

fn salary_fields(record_id: &str, compensation: &CompensationPreference) -> Fields {
    let mut f = linked(record_id);
    put(&mut f, fields::PREFERRED_RATE, compensation.preferred_rate);
    put(&mut f, fields::CURRENCY, compensation.currency.clone());
    put(&mut f, fields::MINIMUM_RATE, compensation.minimum_rate);
    put(
        &mut f,
        fields::AVAILABILITY,
        compensation.availability_hours_per_week,
    );
    f
}
