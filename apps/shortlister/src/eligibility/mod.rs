//! Shortlist eligibility.
//!
//! Deterministic given the snapshot, the exchange rate and `today`:
//! pass when (tier-one company OR enough years) AND rate under the cap
//! AND enough weekly availability AND an acceptable location.

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::currency::{CurrencyError, CurrencyNormalizer, RateLookup, REFERENCE_CURRENCY};
use crate::snapshot::CanonicalSnapshot;

pub mod experience;
pub mod rules;

pub use rules::ShortlistRules;

#[derive(Debug, Error)]
pub enum EligibilityError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("currency conversion failed: {0}")]
    Currency(#[from] CurrencyError),
}

impl EligibilityError {
    /// Data errors skip the applicant; service errors fail it.
    pub fn is_data_error(&self) -> bool {
        matches!(self, EligibilityError::MissingField(_))
    }
}

/// The five data points every rationale reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityFacts {
    pub years_worked: f64,
    pub tier_one_companies: Vec<String>,
    pub normalized_rate: f64,
    pub location: String,
    pub availability_hours_per_week: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityVerdict {
    pub passed: bool,
    pub rationale: String,
    pub facts: EligibilityFacts,
}

/// Fields the rules cannot be evaluated without.
struct RequiredInputs<'s> {
    preferred_rate: f64,
    currency: &'s str,
    location: &'s str,
    availability: f64,
}

impl<'s> RequiredInputs<'s> {
    fn from_snapshot(snapshot: &'s CanonicalSnapshot) -> Result<Self, EligibilityError> {
        let compensation = snapshot
            .compensation
            .as_ref()
            .ok_or(EligibilityError::MissingField("Salary Preferences"))?;
        let details = snapshot
            .personal_details
            .as_ref()
            .ok_or(EligibilityError::MissingField("Personal Details"))?;

        Ok(Self {
            preferred_rate: compensation
                .preferred_rate
                .ok_or(EligibilityError::MissingField("Preferred Rate"))?,
            currency: compensation
                .currency
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .ok_or(EligibilityError::MissingField("Currency"))?,
            location: details
                .location
                .as_deref()
                .ok_or(EligibilityError::MissingField("Location"))?,
            availability: compensation
                .availability_hours_per_week
                .ok_or(EligibilityError::MissingField("Availability (hrs/week)"))?,
        })
    }
}

pub struct EligibilityEvaluator<'a> {
    rules: &'a ShortlistRules,
    currency: CurrencyNormalizer<'a>,
}

impl<'a> EligibilityEvaluator<'a> {
    pub fn new(rules: &'a ShortlistRules, rates: &'a dyn RateLookup) -> Self {
        Self {
            rules,
            currency: CurrencyNormalizer::new(rates),
        }
    }

    /// Evaluates a complete snapshot. The rate lookup is the only I/O and is
    /// skipped for rates already in the reference currency.
    pub async fn evaluate(
        &self,
        snapshot: &CanonicalSnapshot,
        today: NaiveDate,
    ) -> Result<EligibilityVerdict, EligibilityError> {
        let inputs = RequiredInputs::from_snapshot(snapshot)?;
        let normalized_rate = self
            .currency
            .normalize(inputs.preferred_rate, inputs.currency)
            .await?;
        Ok(assess(self.rules, snapshot, &inputs, normalized_rate, today))
    }
}

fn assess(
    rules: &ShortlistRules,
    snapshot: &CanonicalSnapshot,
    inputs: &RequiredInputs<'_>,
    normalized_rate: f64,
    today: NaiveDate,
) -> EligibilityVerdict {
    let facts = EligibilityFacts {
        years_worked: experience::years_worked(&snapshot.work_experience, today),
        tier_one_companies: experience::tier_one_companies(&snapshot.work_experience, rules),
        normalized_rate,
        location: rules.normalize_location(inputs.location),
        availability_hours_per_week: inputs.availability,
    };

    let experienced =
        !facts.tier_one_companies.is_empty() || facts.years_worked >= rules.min_years_worked;
    let passed = experienced
        && facts.normalized_rate < rules.max_rate
        && facts.availability_hours_per_week >= rules.min_availability_hours
        && rules.is_acceptable_location(&facts.location);

    EligibilityVerdict {
        passed,
        rationale: rationale(passed, &facts),
        facts,
    }
}

fn rationale(passed: bool, facts: &EligibilityFacts) -> String {
    let mut text = if passed {
        "The applicant meets the criteria due to the following:\n".to_string()
    } else {
        "The applicant does not meet the criteria. Relevant information:\n".to_string()
    };

    let companies = if facts.tier_one_companies.is_empty() {
        "None".to_string()
    } else {
        facts.tier_one_companies.join(", ")
    };

    // Writing to a String cannot fail.
    let _ = writeln!(text, "Total time working: {:.1} years", facts.years_worked);
    let _ = writeln!(text, "Tier 1 companies worked at: {companies}");
    let _ = writeln!(text, "Preferred Rate ({REFERENCE_CURRENCY}): {}", facts.normalized_rate);
    let _ = writeln!(text, "Location: {}", facts.location);
    let _ = write!(
        text,
        "Availability (hrs/week): {}",
        facts.availability_hours_per_week
    );
    text
}
