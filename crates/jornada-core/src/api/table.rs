//! Table-level query description and the backend seam.
//!
//! `TableQuery` mirrors the hosted backend's builder chain
//! (`table(name).select(cols).eq(col, value).order(col, asc)`), and the
//! `Backend` trait is the only thing the rest of the crate needs from a
//! remote store: filtered reads, insert/upsert of JSON rows and filtered
//! partial updates.

use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::ApiError;

/// Future returned by every `Backend` operation.
pub type BackendFuture<'a, T> = BoxFuture<'a, Result<T, ApiError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<(String, String)>,
    pub order: Option<(String, bool)>,
    pub limit: Option<usize>,
}

impl TableQuery {
    /// Start a query against `table`, selecting every column.
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    /// Equality filter on `column`.
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check a row against the equality filters.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|(column, expected)| match row.get(column) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == *expected,
        })
    }

    /// Only the filters, as REST query-string pairs; used by updates.
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{}", value)))
            .collect()
    }

    /// Render as REST query-string pairs (`col=eq.value`, `order=col.asc`).
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.clone())];
        params.extend(self.filter_params());
        if let Some((column, ascending)) = &self.order {
            let direction = if *ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", column, direction)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

/// Remote table store.
///
/// Implementations return rows as raw JSON; typed decoding happens in
/// [`fetch_rows`] and [`fetch_optional`].
pub trait Backend: Send + Sync {
    fn select(&self, query: TableQuery) -> BackendFuture<'_, Vec<Value>>;

    fn insert(&self, table: &str, row: Value) -> BackendFuture<'_, Vec<Value>>;

    /// Insert or merge `row`, resolving conflicts on the `on_conflict` column(s).
    fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> BackendFuture<'_, Vec<Value>>;

    /// Merge the fields of `patch` into every row matching `query`'s filters,
    /// returning the updated rows.
    fn update(&self, query: TableQuery, patch: Value) -> BackendFuture<'_, Vec<Value>>;
}

/// Run `query` and decode every returned row.
pub async fn fetch_rows<T: DeserializeOwned>(
    backend: &dyn Backend,
    query: TableQuery,
) -> Result<Vec<T>, ApiError> {
    let rows = backend.select(query).await?;
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(ApiError::from))
        .collect()
}

/// Run `query` limited to one row; no rows is `Ok(None)`, not an error.
pub async fn fetch_optional<T: DeserializeOwned>(
    backend: &dyn Backend,
    query: TableQuery,
) -> Result<Option<T>, ApiError> {
    let mut rows = backend.select(query.limit(1)).await?;
    if rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(rows.swap_remove(0))?))
}

/// Serialize `row` and upsert it, decoding the stored representation.
pub async fn upsert_row<T, R>(
    backend: &dyn Backend,
    table: &str,
    row: &T,
    on_conflict: &str,
) -> Result<Option<R>, ApiError>
where
    T: Serialize,
    R: DeserializeOwned,
{
    let value = serde_json::to_value(row)?;
    let mut stored = backend.upsert(table, value, on_conflict).await?;
    if stored.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(stored.swap_remove(0))?))
}

/// Serialize `row` and insert it, decoding the stored representation.
pub async fn insert_row<T, R>(backend: &dyn Backend, table: &str, row: &T) -> Result<Option<R>, ApiError>
where
    T: Serialize,
    R: DeserializeOwned,
{
    let value = serde_json::to_value(row)?;
    let mut stored = backend.insert(table, value).await?;
    if stored.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(stored.swap_remove(0))?))
}
