use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";
const DEFAULT_EXCHANGE_RATE_API_URL: &str = "https://open.er-api.com/v6/latest";
const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-5";

/// Application configuration loaded from environment variables.
/// Constructed once at startup and handed to every client by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub airtable: AirtableConfig,
    pub exchange_rate_api_url: String,
    pub llm: LlmConfig,
    pub http_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub api_url: String,
    pub api_key: String,
    pub base_id: String,
    pub tables: TableIds,
}

/// Airtable table ids for the five collections the pipeline touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIds {
    pub applicants: String,
    pub details: String,
    pub work: String,
    pub salary: String,
    pub shortlist: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            airtable: AirtableConfig {
                api_url: optional_env("AIRTABLE_API_URL", DEFAULT_AIRTABLE_API_URL),
                api_key: require_env("AIRTABLE_API_KEY")?,
                base_id: require_env("AIRTABLE_BASE_ID")?,
                tables: TableIds {
                    applicants: require_env("AIRTABLE_APPLICANTS_ID")?,
                    details: require_env("AIRTABLE_DETAILS_ID")?,
                    work: require_env("AIRTABLE_WORK_ID")?,
                    salary: require_env("AIRTABLE_SALARY_ID")?,
                    shortlist: require_env("AIRTABLE_SHORTLIST_ID")?,
                },
            },
            exchange_rate_api_url: optional_env(
                "EXCHANGE_RATE_API_URL",
                DEFAULT_EXCHANGE_RATE_API_URL,
            ),
            llm: LlmConfig {
                api_url: optional_env("OPENAI_API_URL", DEFAULT_OPENAI_API_URL),
                api_key: require_env("OPENAI_API_KEY")?,
                model: optional_env("LLM_MODEL", DEFAULT_LLM_MODEL),
                max_tokens: parse_env("LLM_MAX_TOKENS", 10_000)?,
                timeout_secs: parse_env("LLM_TIMEOUT_SECS", 15)?,
            },
            http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS", 30)?,
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
}
