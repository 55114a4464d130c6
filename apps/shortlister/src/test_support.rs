//! Fakes shared by the unit tests: fixed exchange rates, a scripted
//! completion service, and a canonical applicant fixture.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::{AirtableConfig, Config, LlmConfig, TableIds};
use crate::currency::{CurrencyError, RateLookup};
use crate::llm_client::{CompletionRequest, CompletionService, LlmError};
use crate::snapshot::{
    CanonicalSnapshot, CompensationPreference, PersonalDetails, Technologies, WorkExperience,
};

/// Rate lookup answering from a fixed table of `CODE -> USD multiplier`.
pub struct FixedRates {
    to_usd: HashMap<String, f64>,
    calls: AtomicUsize,
}

impl FixedRates {
    pub fn new(rates: &[(&str, f64)]) -> Self {
        Self {
            to_usd: rates.iter().map(|(c, r)| (c.to_string(), *r)).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLookup for FixedRates {
    async fn rates(&self, from: &str, to: &[&str]) -> Result<HashMap<String, f64>, CurrencyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rate = self
            .to_usd
            .get(from)
            .copied()
            .ok_or_else(|| CurrencyError::MissingRate {
                from: from.to_string(),
                to: to.join(","),
            })?;
        Ok(to.iter().map(|t| (t.to_string(), rate)).collect())
    }
}

enum Script {
    Replies(Mutex<VecDeque<Result<String, LlmError>>>),
    Hang,
}

/// Completion service replaying a fixed list of replies, then failing.
pub struct ScriptedCompletion {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Script::Replies(Mutex::new(replies.into())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    /// Never answers; only a timeout ends the call.
    pub fn hanging() -> Self {
        Self {
            script: Script::Hang,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Replies(replies) => {
                let next = replies.lock().unwrap().pop_front();
                next.unwrap_or(Err(LlmError::Api {
                    status: 503,
                    message: "overloaded".to_string(),
                }))
            }
            Script::Hang => std::future::pending().await,
        }
    }
}

pub const GOOD_EVALUATION: &str = r#"{"Summary": "Strong backend engineer.", "Score": 8, "Issues": "None", "Follow-Ups": ["Earliest start date?", "Open to contract work?"]}"#;

pub fn llm_config() -> LlmConfig {
    LlmConfig {
        api_url: "http://localhost:9/v1".to_string(),
        api_key: "test-key".to_string(),
        model: "gpt-5".to_string(),
        max_tokens: 10_000,
        timeout_secs: 15,
    }
}

pub fn test_config() -> Config {
    Config {
        airtable: AirtableConfig {
            api_url: "http://localhost:9/v0".to_string(),
            api_key: "test-key".to_string(),
            base_id: "appTest".to_string(),
            tables: TableIds {
                applicants: "tblApplicants".to_string(),
                details: "tblDetails".to_string(),
                work: "tblWork".to_string(),
                salary: "tblSalary".to_string(),
                shortlist: "tblShortlist".to_string(),
            },
        },
        exchange_rate_api_url: "http://localhost:9/latest".to_string(),
        llm: llm_config(),
        http_timeout_secs: 5,
        port: 0,
        rust_log: "info".to_string(),
    }
}

/// Sydney-based Google alumnus asking 80 AUD/h for 25 hours a week.
pub fn complete_snapshot() -> CanonicalSnapshot {
    CanonicalSnapshot {
        personal_details: Some(PersonalDetails {
            full_name: Some("Jane Doe".to_string()),
            email: Some("jane@example.com".to_string()),
            linkedin: Some("https://linkedin.com/in/janedoe".to_string()),
            location: Some("Sydney, Canada".to_string()),
        }),
        work_experience: vec![WorkExperience {
            company: Some("Google".to_string()),
            title: Some("Software Engineer".to_string()),
            start_date: Some("2019-01-01".to_string()),
            end_date: Some("2024-01-01".to_string()),
            technologies: Some(Technologies::List(vec![
                "Go".to_string(),
                "Kubernetes".to_string(),
            ])),
        }],
        compensation: Some(CompensationPreference {
            preferred_rate: Some(80.0),
            currency: Some("AUD".to_string()),
            minimum_rate: Some(60.0),
            availability_hours_per_week: Some(25.0),
        }),
        ..CanonicalSnapshot::default()
    }
}
