use std::sync::Arc;

use crate::config::Config;
use crate::currency::{HttpRateLookup, RateLookup};
use crate::eligibility::ShortlistRules;
use crate::llm_client::{CompletionService, OpenAiClient};
use crate::store::{AirtableStore, RecordStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub rates: Arc<dyn RateLookup>,
    /// Pluggable completion backend. Default: OpenAI chat completions.
    pub llm: Arc<dyn CompletionService>,
    pub rules: Arc<ShortlistRules>,
}

impl AppState {
    /// Wires the production clients from configuration.
    pub fn from_config(config: Config) -> Self {
        let store = AirtableStore::new(&config.airtable, config.http_timeout_secs);
        let rates = HttpRateLookup::new(&config.exchange_rate_api_url, config.http_timeout_secs);
        let llm = OpenAiClient::new(&config.llm);

        Self {
            store: Arc::new(store),
            rates: Arc::new(rates),
            llm: Arc::new(llm),
            rules: Arc::new(ShortlistRules::default()),
            config,
        }
    }
}
