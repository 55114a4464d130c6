// Column names as they appear in the Airtable base.

// Applicants
pub const APPLICANT_ID: &str = "Applicant ID";
pub const COMPRESSED_JSON: &str = "Compressed JSON";
pub const SHORTLIST_STATUS: &str = "Shortlist Status";
pub const LLM_SUMMARY: &str = "LLM Summary";
pub const LLM_SCORE: &str = "LLM Score";
pub const LLM_ISSUES: &str = "LLM Issues";
pub const LLM_FOLLOW_UPS: &str = "LLM Follow-Ups";

pub const SHORTLISTED: &str = "Shortlisted";

// Link back to the applicant, shared by every child table and the shortlist.
pub const APPLICANT: &str = "Applicant";

// Personal Details
pub const FULL_NAME: &str = "Full Name";
pub const EMAIL: &str = "Email";
pub const LINKEDIN: &str = "LinkedIn";
pub const LOCATION: &str = "Location";

// Work Experience
pub const COMPANY: &str = "Company";
pub const TITLE: &str = "Title";
pub const START: &str = "Start";
pub const END: &str = "End";
pub const TECHNOLOGIES: &str = "Technologies";

// Salary Preferences
pub const PREFERRED_RATE: &str = "Preferred Rate";
pub const CURRENCY: &str = "Currency";
pub const MINIMUM_RATE: &str = "Minimum Rate";
pub const AVAILABILITY: &str = "Availability (hrs/week)";

// Shortlist
pub const SCORE_REASON: &str = "Score Reason";
