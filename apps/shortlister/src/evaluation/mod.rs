//! LLM evaluation: qualitative review of a complete applicant snapshot.
//!
//! Flow: build prompt → complete (bounded by a timeout) → parse the strict
//! four-field JSON contract. Any failure costs one attempt; after the last
//! attempt the evaluator returns `LlmOutcome::Exhausted` instead of an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::LlmConfig;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{strip_json_fences, CompletionRequest, CompletionService, LlmError};
use crate::snapshot::CanonicalSnapshot;

pub mod prompts;

use prompts::{EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM};

const MAX_FOLLOW_UPS: usize = 3;
const MIN_SCORE: i64 = 1;
const MAX_SCORE: i64 = 10;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Parsed, validated model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmEvaluation {
    pub summary: String,
    pub score: i64,
    pub issues: String,
    pub follow_ups: Vec<String>,
}

impl LlmEvaluation {
    /// Follow-up questions as a bulleted list, one per line.
    pub fn follow_ups_markdown(&self) -> String {
        self.follow_ups
            .iter()
            .map(|question| format!("- {question}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result of the retry loop. `Exhausted` is the "no result" sentinel, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmOutcome {
    Evaluated(LlmEvaluation),
    Exhausted { attempts: u32 },
}

/// Models sometimes answer list-shaped fields as one string and vice versa.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    #[serde(rename = "Summary")]
    summary: String,
    #[serde(rename = "Score")]
    score: i64,
    #[serde(rename = "Issues")]
    issues: TextOrList,
    #[serde(rename = "Follow-Ups")]
    follow_ups: TextOrList,
}

/// Bounded attempts with `base × 2^attempt` delay after each failed attempt but the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based): 2s, 4s, 8s, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluator
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmEvaluator<'a> {
    llm: &'a dyn CompletionService,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<'a> LlmEvaluator<'a> {
    pub fn new(llm: &'a dyn CompletionService, config: &LlmConfig) -> Self {
        Self {
            llm,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryPolicy::default(),
        }
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the evaluation with retries. Never returns an error.
    pub async fn evaluate(&self, applicant_id: &str, snapshot: &CanonicalSnapshot) -> LlmOutcome {
        let request = match self.build_request(snapshot) {
            Ok(request) => request,
            Err(e) => {
                warn!("Cannot build LLM request for {applicant_id}: {e}");
                return LlmOutcome::Exhausted { attempts: 0 };
            }
        };

        let max_attempts = self.retry.max_attempts;
        for attempt in 1..=max_attempts {
            match self.attempt(&request).await {
                Ok(evaluation) => {
                    info!(
                        "LLM evaluation for {applicant_id} succeeded on attempt {attempt} (score {})",
                        evaluation.score
                    );
                    return LlmOutcome::Evaluated(evaluation);
                }
                Err(e) => {
                    warn!("LLM evaluation attempt {attempt}/{max_attempts} for {applicant_id} failed: {e}");
                    if attempt < max_attempts {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        warn!("LLM evaluation for {applicant_id} gave up after {max_attempts} attempts");
        LlmOutcome::Exhausted {
            attempts: max_attempts,
        }
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<LlmEvaluation, LlmError> {
        let text = tokio::time::timeout(request.timeout, self.llm.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(request.timeout))??;
        parse_evaluation(&text)
    }

    fn build_request(&self, snapshot: &CanonicalSnapshot) -> Result<CompletionRequest, LlmError> {
        let snapshot_json = snapshot.encode()?;
        Ok(CompletionRequest {
            model: self.model.clone(),
            system: format!("{EVALUATION_SYSTEM}\n\n{JSON_ONLY_INSTRUCTION}"),
            user: EVALUATION_PROMPT_TEMPLATE.replace("{snapshot_json}", &snapshot_json),
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        })
    }
}

/// Parses and validates the four-field contract.
fn parse_evaluation(text: &str) -> Result<LlmEvaluation, LlmError> {
    let raw: RawEvaluation = serde_json::from_str(strip_json_fences(text))?;

    let summary = raw.summary.trim().to_string();
    if summary.is_empty() {
        return Err(LlmError::Contract("Summary is empty".to_string()));
    }
    if !(MIN_SCORE..=MAX_SCORE).contains(&raw.score) {
        return Err(LlmError::Contract(format!(
            "Score {} outside {MIN_SCORE}-{MAX_SCORE}",
            raw.score
        )));
    }

    let issues = match raw.issues {
        TextOrList::Text(text) => text.trim().to_string(),
        TextOrList::List(items) => items.join(", "),
    };

    let mut follow_ups = match raw.follow_ups {
        TextOrList::List(items) => items,
        TextOrList::Text(text) => text.lines().map(str::to_string).collect(),
    }
    .into_iter()
    .map(|q| strip_bullet(&q).to_string())
    .filter(|q| !q.is_empty())
    .collect::<Vec<_>>();

    if follow_ups.len() > MAX_FOLLOW_UPS {
        warn!(
            "LLM returned {} follow-ups; keeping the first {MAX_FOLLOW_UPS}",
            follow_ups.len()
        );
        follow_ups.truncate(MAX_FOLLOW_UPS);
    }

    Ok(LlmEvaluation {
        summary,
        score: raw.score,
        issues,
        follow_ups,
    })
}

fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
        .unwrap_or(line)
        .trim()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
