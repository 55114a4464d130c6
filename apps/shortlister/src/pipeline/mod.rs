//! Applicant pipeline. Reconciles every applicant record in one pass.
//!
//! Per applicant:
//! 1. decode the stored snapshot (if any)
//! 2. assemble a fresh snapshot from the subtables
//! 3. persist it unconditionally
//! 4. stop here when incomplete
//! 5. evaluate eligibility; upsert the shortlist entry on pass
//! 6. when the snapshot changed, run the LLM evaluation and persist its fields
//!
//! Applicants are processed sequentially and in isolation: an error on one
//! is logged and recorded, never propagated. Only failing to list the
//! applicants aborts the run.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::LlmConfig;
use crate::currency::RateLookup;
use crate::eligibility::{EligibilityError, EligibilityEvaluator, ShortlistRules};
use crate::evaluation::{LlmEvaluation, LlmEvaluator, LlmOutcome};
use crate::llm_client::CompletionService;
use crate::snapshot::{self, CanonicalSnapshot};
use crate::state::AppState;
use crate::store::{fields, Fields, Record, RecordStore, StoreError, Table};

pub mod decompress;
pub mod handlers;
pub mod shortlist;

pub use decompress::{DecompressReport, Decompressor};

/// Batch-level failure: the run could not even start.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to list applicants: {0}")]
    ListApplicants(#[source] StoreError),
}

/// Failure confined to one applicant.
#[derive(Debug, Error)]
enum ApplicantError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("snapshot write failed: {0}")]
    SnapshotWrite(#[source] StoreError),

    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("eligibility evaluation failed: {0}")]
    Eligibility(#[from] EligibilityError),
}

// ────────────────────────────────────────────────────────────────────────────
// Run report
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    MissingApplicantId,
    Incomplete { missing: Vec<String> },
    InvalidData { detail: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LlmStatus {
    Unchanged,
    Evaluated { score: i64 },
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApplicantOutcome {
    Updated { shortlisted: bool, llm: LlmStatus },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicantReport {
    pub applicant_id: String,
    #[serde(flatten)]
    pub outcome: ApplicantOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub processed: usize,
    pub updated: usize,
    pub shortlisted: usize,
    pub llm_evaluated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub applicants: Vec<ApplicantReport>,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            processed: 0,
            updated: 0,
            shortlisted: 0,
            llm_evaluated: 0,
            skipped: 0,
            failed: 0,
            applicants: Vec::new(),
        }
    }

    fn record(&mut self, applicant_id: String, outcome: ApplicantOutcome) {
        self.processed += 1;
        match &outcome {
            ApplicantOutcome::Updated { shortlisted, llm } => {
                self.updated += 1;
                if *shortlisted {
                    self.shortlisted += 1;
                }
                if matches!(llm, LlmStatus::Evaluated { .. }) {
                    self.llm_evaluated += 1;
                }
            }
            ApplicantOutcome::Skipped { .. } => self.skipped += 1,
            ApplicantOutcome::Failed { .. } => self.failed += 1,
        }
        self.applicants.push(ApplicantReport {
            applicant_id,
            outcome,
        });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct Pipeline<'a> {
    store: &'a dyn RecordStore,
    eligibility: EligibilityEvaluator<'a>,
    llm: LlmEvaluator<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        rates: &'a dyn RateLookup,
        llm: &'a dyn CompletionService,
        rules: &'a ShortlistRules,
        llm_config: &LlmConfig,
    ) -> Self {
        Self {
            store,
            eligibility: EligibilityEvaluator::new(rules, rates),
            llm: LlmEvaluator::new(llm, llm_config),
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            state.store.as_ref(),
            state.rates.as_ref(),
            state.llm.as_ref(),
            state.rules.as_ref(),
            &state.config.llm,
        )
    }

    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        self.run_on(Utc::now().date_naive()).await
    }

    /// Runs the batch with `today` as the end date of ongoing roles.
    pub async fn run_on(&self, today: NaiveDate) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id);

        async move {
            let applicants = self
                .store
                .list(Table::Applicants, None)
                .await
                .map_err(PipelineError::ListApplicants)?;
            info!("Processing {} applicants", applicants.len());

            let mut report = RunReport::new(run_id);
            for applicant in &applicants {
                let applicant_id = applicant
                    .str_field(fields::APPLICANT_ID)
                    .map(str::to_string)
                    .filter(|id| !id.trim().is_empty());

                let Some(applicant_id) = applicant_id else {
                    warn!("Skipping record {} without an Applicant ID", applicant.id);
                    report.record(
                        applicant.id.clone(),
                        ApplicantOutcome::Skipped {
                            reason: SkipReason::MissingApplicantId,
                        },
                    );
                    continue;
                };

                let outcome = self
                    .process(applicant, &applicant_id, today)
                    .instrument(info_span!("applicant", %applicant_id))
                    .await
                    .unwrap_or_else(|e| {
                        error!("Error processing applicant {applicant_id}: {e}");
                        ApplicantOutcome::Failed {
                            error: e.to_string(),
                        }
                    });
                report.record(applicant_id, outcome);
            }

            info!(
                "Run complete: {} processed, {} updated, {} shortlisted, {} LLM evaluations, {} skipped, {} failed",
                report.processed,
                report.updated,
                report.shortlisted,
                report.llm_evaluated,
                report.skipped,
                report.failed
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn process(
        &self,
        applicant: &Record,
        applicant_id: &str,
        today: NaiveDate,
    ) -> Result<ApplicantOutcome, ApplicantError> {
        let previous = CanonicalSnapshot::decode_stored(
            applicant.str_field(fields::COMPRESSED_JSON),
            applicant_id,
        );

        let snapshot = snapshot::assemble_for(self.store, applicant_id).await?;
        let encoded = snapshot.encode()?;

        let mut snapshot_fields = Fields::new();
        snapshot_fields.insert(fields::COMPRESSED_JSON.to_string(), json!(encoded));
        self.store
            .update(Table::Applicants, &applicant.id, snapshot_fields)
            .await
            .map_err(ApplicantError::SnapshotWrite)?;
        info!("Updated JSON for {applicant_id}");

        if !snapshot.is_complete() {
            let missing: Vec<String> = snapshot
                .missing_sections()
                .into_iter()
                .map(str::to_string)
                .collect();
            info!("Snapshot for {applicant_id} is incomplete (missing {missing:?})");
            return Ok(ApplicantOutcome::Skipped {
                reason: SkipReason::Incomplete { missing },
            });
        }

        let verdict = match self.eligibility.evaluate(&snapshot, today).await {
            Ok(verdict) => verdict,
            Err(e) if e.is_data_error() => {
                warn!("Skipping evaluation of {applicant_id}: {e}");
                return Ok(ApplicantOutcome::Skipped {
                    reason: SkipReason::InvalidData {
                        detail: e.to_string(),
                    },
                });
            }
            Err(e) => return Err(e.into()),
        };

        if verdict.passed {
            shortlist::upsert_entry(
                self.store,
                applicant,
                applicant_id,
                &verdict.rationale,
                &encoded,
            )
            .await?;
        } else {
            info!("{applicant_id} does not meet the shortlist criteria");
        }

        let llm = if snapshot::has_changed(&snapshot, previous.as_ref()) {
            info!("Running LLM eval for {applicant_id}");
            match self.llm.evaluate(applicant_id, &snapshot).await {
                LlmOutcome::Evaluated(evaluation) => {
                    self.persist_evaluation(applicant, &evaluation).await?;
                    LlmStatus::Evaluated {
                        score: evaluation.score,
                    }
                }
                LlmOutcome::Exhausted { attempts } => LlmStatus::Exhausted { attempts },
            }
        } else {
            LlmStatus::Unchanged
        };

        Ok(ApplicantOutcome::Updated {
            shortlisted: verdict.passed,
            llm,
        })
    }

    async fn persist_evaluation(
        &self,
        applicant: &Record,
        evaluation: &LlmEvaluation,
    ) -> Result<(), StoreError> {
        let mut update = Fields::new();
        update.insert(fields::LLM_SUMMARY.to_string(), json!(evaluation.summary));
        update.insert(fields::LLM_SCORE.to_string(), json!(evaluation.score));
        update.insert(fields::LLM_ISSUES.to_string(), json!(evaluation.issues));
        update.insert(
            fields::LLM_FOLLOW_UPS.to_string(),
            json!(evaluation.follow_ups_markdown()),
        );
        self.store
            .update(Table::Applicants, &applicant.id, update)
            .await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::test_support::{
        complete_snapshot, llm_config, FixedRates, ScriptedCompletion, GOOD_EVALUATION,
    };
    use serde_json::Value;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    /// Seeds an applicant with the three subtables matching `complete_snapshot()`.
    fn seed_complete_applicant(store: &MemoryStore, applicant_id: &str) -> String {
        let id = store.seed(Table::Applicants, json!({ "Applicant ID": applicant_id }));
        store.seed(
            Table::Details,
            json!({
                "Applicant": [id.clone()],
                "Full Name": "Jane Doe",
                "Email": "jane@example.com",
                "LinkedIn": "https://linkedin.com/in/janedoe",
                "Location": "Sydney, Canada"
            }),
        );
        store.seed(
            Table::WorkExperience,
            json!({
                "Applicant": [id.clone()],
                "Company": "Google",
                "Title": "Software Engineer",
                "Start": "2019-01-01",
                "End": "2024-01-01",
                "Technologies": ["Go", "Kubernetes"]
            }),
        );
        store.seed(
            Table::SalaryPreferences,
            json!({
                "Applicant": [id.clone()],
                "Preferred Rate": 80,
                "Currency": "AUD",
                "Minimum Rate": 60,
                "Availability (hrs/week)": 25
            }),
        );
        id
    }

    struct Harness {
        store: MemoryStore,
        rates: FixedRates,
        llm: ScriptedCompletion,
        rules: ShortlistRules,
        config: LlmConfig,
    }

    impl Harness {
        fn new(llm: ScriptedCompletion) -> Self {
            Self {
                store: MemoryStore::new(),
                rates: FixedRates::new(&[("AUD", 0.66)]),
                llm,
                rules: ShortlistRules::default(),
                config: llm_config(),
            }
        }

        fn pipeline(&self) -> Pipeline<'_> {
            Pipeline::new(&self.store, &self.rates, &self.llm, &self.rules, &self.config)
        }

        async fn run(&self) -> RunReport {
            self.pipeline().run_on(today()).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_complete_applicant_is_shortlisted_and_evaluated() {
        let harness = Harness::new(ScriptedCompletion::new(vec![Ok(GOOD_EVALUATION.to_string())]));
        let id = seed_complete_applicant(&harness.store, "A1");

        let report = harness.run().await;

        assert_eq!(report.processed, 1);
        assert_eq!(report.shortlisted, 1);
        assert_eq!(report.llm_evaluated, 1);
        assert_eq!(
            report.applicants[0].outcome,
            ApplicantOutcome::Updated {
                shortlisted: true,
                llm: LlmStatus::Evaluated { score: 8 },
            }
        );

        let applicant = harness.store.record(Table::Applicants, &id).unwrap();
        let stored = CanonicalSnapshot::decode(applicant.str_field("Compressed JSON").unwrap()).unwrap();
        assert_eq!(stored, complete_snapshot());
        assert_eq!(applicant.str_field("Shortlist Status"), Some("Shortlisted"));
        assert_eq!(applicant.str_field("LLM Summary"), Some("Strong backend engineer."));
        assert_eq!(applicant.fields["LLM Score"], json!(8));
        assert_eq!(applicant.str_field("LLM Issues"), Some("None"));
        assert_eq!(
            applicant.str_field("LLM Follow-Ups"),
            Some("- Earliest start date?\n- Open to contract work?")
        );

        let shortlist = harness.store.records(Table::Shortlist);
        assert_eq!(shortlist.len(), 1);
        let reason = shortlist[0].str_field("Score Reason").unwrap();
        assert!(reason.contains("Total time working: 5.0 years"));
        assert!(reason.contains("Preferred Rate (USD): 52.8"));
        assert!(reason.contains("Location: Canada"));
    }

    #[tokio::test]
    async fn test_second_run_without_changes_skips_llm_but_reevaluates_shortlist() {
        let harness = Harness::new(ScriptedCompletion::new(vec![Ok(GOOD_EVALUATION.to_string())]));
        seed_complete_applicant(&harness.store, "A1");

        harness.run().await;
        let second = harness.run().await;

        assert_eq!(harness.llm.calls(), 1);
        assert_eq!(
            second.applicants[0].outcome,
            ApplicantOutcome::Updated {
                shortlisted: true,
                llm: LlmStatus::Unchanged,
            }
        );
        assert_eq!(harness.store.records(Table::Shortlist).len(), 1);
        assert_eq!(harness.store.call_count("update", Table::Shortlist), 1);
    }

    #[tokio::test]
    async fn test_source_change_triggers_new_llm_evaluation() {
        let harness = Harness::new(ScriptedCompletion::new(vec![
            Ok(GOOD_EVALUATION.to_string()),
            Ok(GOOD_EVALUATION.replace("\"Score\": 8", "\"Score\": 6")),
        ]));
        let id = seed_complete_applicant(&harness.store, "A1");
        harness.run().await;

        harness.store.seed(
            Table::WorkExperience,
            json!({ "Applicant": [id.clone()], "Company": "Acme", "Start": "2024-02-01" }),
        );
        let report = harness.run().await;

        assert_eq!(harness.llm.calls(), 2);
        assert_eq!(
            report.applicants[0].outcome,
            ApplicantOutcome::Updated {
                shortlisted: true,
                llm: LlmStatus::Evaluated { score: 6 },
            }
        );
        let applicant = harness.store.record(Table::Applicants, &id).unwrap();
        assert_eq!(applicant.fields["LLM Score"], json!(6));
    }

    #[tokio::test]
    async fn test_decompressed_rows_compress_to_the_same_snapshot() {
        let harness = Harness::new(ScriptedCompletion::new(vec![Ok(GOOD_EVALUATION.to_string())]));
        let id = seed_complete_applicant(&harness.store, "A1");
        harness.run().await;

        Decompressor::new(&harness.store).run().await.unwrap();
        let work = harness.store.records(Table::WorkExperience);
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].fields["Technologies"], json!(["Go", "Kubernetes"]));

        let report = harness.run().await;
        assert_eq!(
            report.applicants[0].outcome,
            ApplicantOutcome::Updated {
                shortlisted: true,
                llm: LlmStatus::Unchanged,
            }
        );
        let applicant = harness.store.record(Table::Applicants, &id).unwrap();
        let stored = CanonicalSnapshot::decode(applicant.str_field("Compressed JSON").unwrap()).unwrap();
        assert_eq!(stored, complete_snapshot());
    }

    #[tokio::test]
    async fn test_incomplete_snapshot_is_stored_but_not_evaluated() {
        let harness = Harness::new(ScriptedCompletion::failing());
        let id = harness
            .store
            .seed(Table::Applicants, json!({ "Applicant ID": "A1" }));
        harness.store.seed(
            Table::Details,
            json!({ "Applicant": [id.clone()], "Full Name": "Jane Doe" }),
        );

        let report = harness.run().await;

        assert_eq!(
            report.applicants[0].outcome,
            ApplicantOutcome::Skipped {
                reason: SkipReason::Incomplete {
                    missing: vec!["Work Experience".to_string(), "Salary Preferences".to_string()],
                },
            }
        );
        let applicant = harness.store.record(Table::Applicants, &id).unwrap();
        let stored: Value = serde_json::from_str(applicant.str_field("Compressed JSON").unwrap()).unwrap();
        assert_eq!(stored["Personal Details"]["Full Name"], "Jane Doe");
        assert_eq!(stored["Work Experience"], json!([]));
        assert_eq!(harness.llm.calls(), 0);
        assert_eq!(harness.rates.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_required_field_skips_without_failing_batch() {
        let harness = Harness::new(ScriptedCompletion::new(vec![Ok(GOOD_EVALUATION.to_string())]));
        let broken = seed_complete_applicant(&harness.store, "A1");
        seed_complete_applicant(&harness.store, "A2");

        // Drop Location from A1's details row.
        let details = harness
            .store
            .records(Table::Details)
            .into_iter()
            .find(|r| r.fields["Applicant"] == json!([broken.clone()]))
            .unwrap();
        let mut cleared = Fields::new();
        cleared.insert("Location".to_string(), Value::Null);
        harness
            .store
            .update(Table::Details, &details.id, cleared)
            .await
            .unwrap();

        let report = harness.run().await;

        assert!(matches!(
            report.applicants[0].outcome,
            ApplicantOutcome::Skipped {
                reason: SkipReason::InvalidData { .. }
            }
        ));
        assert!(matches!(
            report.applicants[1].outcome,
            ApplicantOutcome::Updated { shortlisted: true, .. }
        ));
        assert_eq!(harness.llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_lookup_failure_fails_only_that_applicant() {
        let mut harness = Harness::new(ScriptedCompletion::new(vec![Ok(GOOD_EVALUATION.to_string())]));
        harness.rates = FixedRates::new(&[]);
        seed_complete_applicant(&harness.store, "A1");
        let usd = seed_complete_applicant(&harness.store, "A2");
        let salary = harness
            .store
            .records(Table::SalaryPreferences)
            .into_iter()
            .find(|r| r.fields["Applicant"] == json!([usd.clone()]))
            .unwrap();
        let mut currency = Fields::new();
        currency.insert("Currency".to_string(), json!("USD"));
        harness
            .store
            .update(Table::SalaryPreferences, &salary.id, currency)
            .await
            .unwrap();

        let report = harness.run().await;

        assert_eq!(report.failed, 1);
        assert!(matches!(
            &report.applicants[0].outcome,
            ApplicantOutcome::Failed { error } if error.contains("currency")
        ));
        assert_eq!(report.updated, 1);
        assert_eq!(report.applicants[1].applicant_id, "A2");
    }

    #[tokio::test]
    async fn test_snapshot_write_failure_moves_on() {
        let harness = Harness::new(ScriptedCompletion::failing());
        seed_complete_applicant(&harness.store, "A1");
        seed_complete_applicant(&harness.store, "A2");
        harness.store.fail_updates_on(Table::Applicants);

        let report = harness.run().await;

        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 2);
        assert!(report.applicants.iter().all(|a| matches!(
            &a.outcome,
            ApplicantOutcome::Failed { error } if error.starts_with("snapshot write failed")
        )));
        assert!(harness.store.records(Table::Shortlist).is_empty());
        assert_eq!(harness.llm.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_llm_keeps_previous_llm_fields() {
        let harness = Harness::new(ScriptedCompletion::failing());
        let id = seed_complete_applicant(&harness.store, "A1");
        let mut previous = Fields::new();
        previous.insert("LLM Summary".to_string(), json!("old summary"));
        harness
            .store
            .update(Table::Applicants, &id, previous)
            .await
            .unwrap();

        let report = harness.run().await;

        assert_eq!(
            report.applicants[0].outcome,
            ApplicantOutcome::Updated {
                shortlisted: true,
                llm: LlmStatus::Exhausted { attempts: 3 },
            }
        );
        assert_eq!(report.failed, 0);
        let applicant = harness.store.record(Table::Applicants, &id).unwrap();
        assert_eq!(applicant.str_field("LLM Summary"), Some("old summary"));
    }

    #[tokio::test]
    async fn test_record_without_applicant_id_is_skipped() {
        let harness = Harness::new(ScriptedCompletion::failing());
        harness.store.seed(Table::Applicants, json!({ "Applicant ID": "" }));

        let report = harness.run().await;

        assert_eq!(report.skipped, 1);
        assert_eq!(
            report.applicants[0].outcome,
            ApplicantOutcome::Skipped {
                reason: SkipReason::MissingApplicantId,
            }
        );
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_run() {
        let harness = Harness::new(ScriptedCompletion::failing());
        harness.store.fail_lists_on(Table::Applicants);

        let result = harness.pipeline().run_on(today()).await;
        assert!(matches!(result, Err(PipelineError::ListApplicants(_))));
    }

    #[test]
    fn test_report_serializes_outcome_inline() {
        let mut report = RunReport::new(Uuid::nil());
        report.record(
            "A1".to_string(),
            ApplicantOutcome::Updated {
                shortlisted: false,
                llm: LlmStatus::Unchanged,
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["updated"], 1);
        assert_eq!(json["applicants"][0]["applicant_id"], "A1");
        assert_eq!(json["applicants"][0]["outcome"], "updated");
        assert_eq!(json["applicants"][0]["llm"]["status"], "unchanged");
    }
}
