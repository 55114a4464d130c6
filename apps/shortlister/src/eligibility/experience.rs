use chrono::NaiveDate;

use super::rules::ShortlistRules;
use crate::currency::round_to;
use crate::snapshot::WorkExperience;

const DAYS_PER_YEAR: f64 = 365.25;

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), "%Y-%m-%d").ok()
}

/// Total years across all roles, rounded to one decimal.
///
/// Roles without a parsable start date are skipped. A missing or
/// unparsable end date means the role runs until `today`. Overlapping
/// roles are summed, not merged.
pub fn years_worked(roles: &[WorkExperience], today: NaiveDate) -> f64 {
    let total: f64 = roles
        .iter()
        .filter_map(|role| {
            let start = parse_date(role.start_date.as_deref())?;
            let end = parse_date(role.end_date.as_deref()).unwrap_or(today);
            Some((end - start).num_days() as f64 / DAYS_PER_YEAR)
        })
        .sum();
    round_to(total, 1)
}

/// Tier-one companies in work-history order, each listed once.
pub fn tier_one_companies(roles: &[WorkExperience], rules: &ShortlistRules) -> Vec<String> {
    let mut matched: Vec<String> = Vec::new();
    for company in roles.iter().filter_map(|role| role.company.as_deref()) {
        if rules.is_tier_one(company) && !matched.iter().any(|m| m == company) {
            matched.push(company.to_string());
        }
    }
    matched
}
