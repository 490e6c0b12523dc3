//! In-memory `Backend` used by tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

use serde_json::Value;

use super::table::{Backend, BackendFuture, TableQuery};
use super::ApiError;

#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    selects: AtomicUsize,
    writes: AtomicUsize,
    fail_next: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables.lock().unwrap().insert(table.to_string(), rows);
        self
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    pub fn select_count(&self) -> usize {
        self.selects.load(AtomicOrdering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    /// Make the next operation fail with a backend error carrying `message`.
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    fn take_failure(&self) -> Result<(), ApiError> {
        match self.fail_next.lock().unwrap().take() {
            Some(message) => Err(ApiError::Backend {
                code: "TEST".to_string(),
                message,
            }),
            None => Ok(()),
        }
    }

    fn run_select(&self, query: &TableQuery) -> Result<Vec<Value>, ApiError> {
        self.selects.fetch_add(1, AtomicOrdering::SeqCst);
        self.take_failure()?;

        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Value> = tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some((column, ascending)) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_json(a.get(column), b.get(column));
                if *ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn run_write(&self, table: &str, row: Value, on_conflict: Option<&str>) -> Result<Vec<Value>, ApiError> {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        self.take_failure()?;

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();

        if let Some(columns) = on_conflict {
            let keys: Vec<&str> = columns.split(',').map(str::trim).collect();
            if let Some(existing) = rows
                .iter_mut()
                .find(|r| keys.iter().all(|k| r.get(*k).is_some() && r.get(*k) == row.get(*k)))
            {
                if let (Value::Object(target), Value::Object(source)) = (existing, &row) {
                    for (k, v) in source {
                        target.insert(k.clone(), v.clone());
                    }
                    return Ok(vec![Value::Object(target.clone())]);
                }
            }
        }

        rows.push(row.clone());
        Ok(vec![row])
    }

    fn run_update(&self, query: &TableQuery, patch: &Value) -> Result<Vec<Value>, ApiError> {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        self.take_failure()?;

        let mut tables = self.tables.lock().unwrap();
        let Some(rows) = tables.get_mut(&query.table) else {
            return Ok(Vec::new());
        };
        let Value::Object(fields) = patch else {
            return Err(ApiError::InvalidResponse("update patch must be an object".to_string()));
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| query.matches(r)) {
            if let Value::Object(target) = row {
                for (k, v) in fields {
                    target.insert(k.clone(), v.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }
}

fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or_default()
            .partial_cmp(&y.as_f64().unwrap_or_default())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

impl Backend for MemoryBackend {
    fn select(&self, query: TableQuery) -> BackendFuture<'_, Vec<Value>> {
        let result = self.run_select(&query);
        Box::pin(async move { result })
    }

    fn insert(&self, table: &str, row: Value) -> BackendFuture<'_, Vec<Value>> {
        let result = self.run_write(table, row, None);
        Box::pin(async move { result })
    }

    fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> BackendFuture<'_, Vec<Value>> {
        let result = self.run_write(table, row, Some(on_conflict));
        Box::pin(async move { result })
    }

    fn update(&self, query: TableQuery, patch: Value) -> BackendFuture<'_, Vec<Value>> {
        let result = self.run_update(&query, &patch);
        Box::pin(async move { result })
    }
}
