/// Companies whose alumni skip the minimum-experience requirement.
/// Matched against the `Company` column exactly.
pub const TIER_ONE_COMPANIES: &[&str] = &[
    "Google",
    "Meta",
    "OpenAI",
    "Apple",
    "Amazon",
    "Microsoft",
    "Tesla",
    "SpaceX",
    "Alphabet",
    "Alibaba",
    "Tencent",
    "Samsung",
    "Sony",
    "Nintendo",
    "EA",
];

/// Canonical location tags. Order matters: the first tag found as a
/// case-insensitive substring of the free-text location wins.
pub const ACCEPTABLE_LOCATIONS: &[&str] = &["US", "Canada", "Germany", "UK", "India"];

/// Thresholds for shortlist membership.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortlistRules {
    pub tier_one_companies: Vec<String>,
    pub acceptable_locations: Vec<String>,
    /// Exclusive upper bound on the hourly rate in the reference currency.
    pub max_rate: f64,
    pub min_availability_hours: f64,
    pub min_years_worked: f64,
}

impl Default for ShortlistRules {
    fn default() -> Self {
        Self {
            tier_one_companies: TIER_ONE_COMPANIES.iter().map(|c| c.to_string()).collect(),
            acceptable_locations: ACCEPTABLE_LOCATIONS.iter().map(|l| l.to_string()).collect(),
            max_rate: 100.0,
            min_availability_hours: 20.0,
            min_years_worked: 4.0,
        }
    }
}

impl ShortlistRules {
    pub fn is_tier_one(&self, company: &str) -> bool {
        self.tier_one_companies.iter().any(|c| c == company)
    }

    /// Replaces a free-text location with the first matching tag, or returns it unchanged.
    pub fn normalize_location(&self, location: &str) -> String {
        let lowered = location.to_lowercase();
        self.acceptable_locations
            .iter()
            .find(|tag| lowered.contains(&tag.to_lowercase()))
            .cloned()
            .unwrap_or_else(|| location.to_string())
    }

    pub fn is_acceptable_location(&self, location: &str) -> bool {
        self.acceptable_locations.iter().any(|tag| tag == location)
    }
}
