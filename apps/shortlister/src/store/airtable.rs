use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Fields, Filter, Record, RecordStore, StoreError, Table};
use crate::config::{AirtableConfig, TableIds};

/// Airtable rejects batch deletes of more than ten records per request.
const MAX_BATCH_DELETE: usize = 10;

#[derive(Debug, Deserialize)]
struct ListResponse {
    records: Vec<Record>,
    offset: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    fields: &'a Fields,
}

/// Airtable reports errors either as `{"error": {"message": ...}}` or `{"error": "CODE"}`.
#[derive(Debug, Deserialize)]
struct AirtableError {
    error: Value,
}

impl AirtableError {
    fn message(&self) -> String {
        match &self.error {
            Value::String(code) => code.clone(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        }
    }
}

/// `RecordStore` backed by the Airtable REST API.
#[derive(Clone)]
pub struct AirtableStore {
    client: Client,
    base_url: String,
    api_key: String,
    tables: TableIds,
}

impl AirtableStore {
    pub fn new(config: &AirtableConfig, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: format!(
                "{}/{}",
                config.api_url.trim_end_matches('/'),
                config.base_id
            ),
            api_key: config.api_key.clone(),
            tables: config.tables.clone(),
        }
    }

    fn table_id(&self, table: Table) -> &str {
        match table {
            Table::Applicants => &self.tables.applicants,
            Table::Details => &self.tables.details,
            Table::WorkExperience => &self.tables.work,
            Table::SalaryPreferences => &self.tables.salary,
            Table::Shortlist => &self.tables.shortlist,
        }
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/{}", self.base_url, self.table_id(table))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status, body))
    }
}

fn error_from_body(status: StatusCode, body: String) -> StoreError {
    let message = serde_json::from_str::<AirtableError>(&body)
        .map(|e| e.message())
        .unwrap_or(body);
    if status == StatusCode::NOT_FOUND {
        return StoreError::NotFound(message);
    }
    StoreError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn list(&self, table: Table, filter: Option<&Filter>) -> Result<Vec<Record>, StoreError> {
        let url = self.table_url(table);
        let formula = filter.map(Filter::to_formula);
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(formula) = formula.as_deref() {
                query.push(("filterByFormula", formula));
            }
            if let Some(offset) = offset.as_deref() {
                query.push(("offset", offset));
            }

            let page: ListResponse = self
                .send(self.client.get(&url).query(&query))
                .await?
                .json()
                .await?;
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        debug!("Listed {} records from {:?}", records.len(), table);
        Ok(records)
    }

    async fn create(&self, table: Table, fields: Fields) -> Result<Record, StoreError> {
        let request = self
            .client
            .post(self.table_url(table))
            .json(&WriteRequest { fields: &fields });
        Ok(self.send(request).await?.json().await?)
    }

    async fn update(&self, table: Table, id: &str, fields: Fields) -> Result<Record, StoreError> {
        let request = self
            .client
            .patch(format!("{}/{}", self.table_url(table), id))
            .json(&WriteRequest { fields: &fields });
        Ok(self.send(request).await?.json().await?)
    }

    async fn batch_delete(&self, table: Table, ids: &[String]) -> Result<(), StoreError> {
        let url = self.table_url(table);
        for chunk in ids.chunks(MAX_BATCH_DELETE) {
            let query: Vec<(&str, &str)> = chunk.iter().map(|id| ("records[]", id.as_str())).collect();
            self.send(self.client.delete(&url).query(&query)).await?;
        }
        debug!("Deleted {} records from {:?}", ids.len(), table);
        Ok(())
    }
}
