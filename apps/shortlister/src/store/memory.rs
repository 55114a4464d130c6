use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{fields, Fields, Filter, Record, RecordStore, StoreError, Table};

/// In-memory `RecordStore` for tests.
///
/// Linked-record filters behave like Airtable formulas: a field holding
/// `["recXYZ"]` matches the value of the linked applicant's `Applicant ID`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<Table, Vec<Record>>,
    next_id: u64,
    calls: Vec<(&'static str, Table)>,
    failing_updates: Vec<Table>,
    failing_lists: Vec<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record directly, bypassing the call log. Returns the new id.
    pub fn seed(&self, table: Table, fields: Value) -> String {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.allocate_id();
        let fields = match fields {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        inner
            .tables
            .entry(table)
            .or_default()
            .push(Record { id: id.clone(), fields });
        id
    }

    pub fn records(&self, table: Table) -> Vec<Record> {
        let inner = self.inner.lock().unwrap();
        inner.tables.get(&table).cloned().unwrap_or_default()
    }

    pub fn record(&self, table: Table, id: &str) -> Option<Record> {
        self.records(table).into_iter().find(|r| r.id == id)
    }

    /// Number of calls of `op` ("list", "create", "update", "batch_delete") against `table`.
    pub fn call_count(&self, op: &str, table: Table) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .calls
            .iter()
            .filter(|(o, t)| *o == op && *t == table)
            .count()
    }

    pub fn fail_updates_on(&self, table: Table) {
        self.inner.lock().unwrap().failing_updates.push(table);
    }

    pub fn fail_lists_on(&self, table: Table) {
        self.inner.lock().unwrap().failing_lists.push(table);
    }
}

impl Inner {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("rec{:05}", self.next_id)
    }

    fn matches(&self, record: &Record, filter: &Filter) -> bool {
        match record.fields.get(&filter.field) {
            Some(Value::String(s)) => *s == filter.value,
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).any(|linked| {
                linked == filter.value || self.applicant_id_of(linked) == Some(&filter.value)
            }),
            _ => false,
        }
    }

    fn applicant_id_of(&self, record_id: &str) -> Option<&String> {
        self.tables
            .get(&Table::Applicants)?
            .iter()
            .find(|r| r.id == record_id)
            .and_then(|r| match r.fields.get(fields::APPLICANT_ID) {
                Some(Value::String(s)) => Some(s),
                _ => None,
            })
    }
}

fn unavailable(table: Table) -> StoreError {
    StoreError::Api {
        status: 503,
        message: format!("{table:?} unavailable"),
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, table: Table, filter: Option<&Filter>) -> Result<Vec<Record>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(("list", table));
        if inner.failing_lists.contains(&table) {
            return Err(unavailable(table));
        }
        let records = inner.tables.get(&table).cloned().unwrap_or_default();
        Ok(match filter {
            Some(filter) => records
                .into_iter()
                .filter(|r| inner.matches(r, filter))
                .collect(),
            None => records,
        })
    }

    async fn create(&self, table: Table, fields: Fields) -> Result<Record, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(("create", table));
        let record = Record {
            id: inner.allocate_id(),
            fields,
        };
        inner.tables.entry(table).or_default().push(record.clone());
        Ok(record)
    }

    async fn update(&self, table: Table, id: &str, fields: Fields) -> Result<Record, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(("update", table));
        if inner.failing_updates.contains(&table) {
            return Err(unavailable(table));
        }
        let record = inner
            .tables
            .get_mut(&table)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.fields.extend(fields);
        Ok(record.clone())
    }

    async fn batch_delete(&self, table: Table, ids: &[String]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(("batch_delete", table));
        if let Some(records) = inner.tables.get_mut(&table) {
            records.retain(|r| !ids.contains(&r.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_linked_filter_resolves_applicant_id() {
        let store = MemoryStore::new();
        let applicant = store.seed(Table::Applicants, json!({ "Applicant ID": "A1" }));
        store.seed(Table::Shortlist, json!({ "Applicant": [applicant] }));
        store.seed(Table::Shortlist, json!({ "Applicant": ["recOther"] }));

        let found = store
            .list(Table::Shortlist, Some(&Filter::linked_to("A1")))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let id = store.seed(Table::Applicants, json!({ "Applicant ID": "A1" }));
        let mut fields = Fields::new();
        fields.insert("LLM Score".to_string(), json!(7));
        store.update(Table::Applicants, &id, fields).await.unwrap();

        let record = store.record(Table::Applicants, &id).unwrap();
        assert_eq!(record.str_field("Applicant ID"), Some("A1"));
        assert_eq!(record.fields["LLM Score"], json!(7));
    }
}
