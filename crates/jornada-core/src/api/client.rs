//! HTTP client for the hosted backend's REST table endpoint.
//!
//! Tables are exposed under `{url}/rest/v1/{table}`; filters, ordering and
//! limits travel in the query string. Writes are JSON `POST`s whose
//! `Prefer` header selects insert or merge-on-conflict semantics, and
//! filtered partial updates are `PATCH`es.

use std::time::Duration;

use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use super::table::{Backend, BackendFuture, TableQuery};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Path prefix for table endpoints
const REST_PATH: &str = "rest/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// `Prefer` header for inserts that echo the stored row back
const PREFER_RETURN: &str = "return=representation";

/// `Prefer` header for upserts
const PREFER_MERGE: &str = "resolution=merge-duplicates,return=representation";

/// Client for the hosted backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl ApiClient {
    /// Create a new client for the project at `base_url`
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: None,
        })
    }

    /// Create a new ApiClient acting as a signed-in user, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            anon_key: self.anon_key.clone(),
            access_token: Some(token),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, table)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("apikey", header::HeaderValue::from_str(&self.anon_key)?);

        // Row-level security sees the user only through their own token
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Decode a JSON array body; an empty body (no representation) is no rows.
    async fn read_rows(response: reqwest::Response) -> Result<Vec<Value>, ApiError> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&text)? {
            Value::Array(rows) => Ok(rows),
            Value::Object(row) => Ok(vec![Value::Object(row)]),
            other => Err(ApiError::InvalidResponse(format!(
                "expected rows, got {}",
                other
            ))),
        }
    }

    async fn get_rows(&self, query: TableQuery) -> Result<Vec<Value>, ApiError> {
        let url = self.table_url(&query.table);
        debug!(table = %query.table, filters = query.filters.len(), "Selecting rows");

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .query(&query.params())
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::read_rows(response).await
    }

    async fn post_rows(
        &self,
        table: String,
        row: Value,
        prefer: &'static str,
        on_conflict: Option<String>,
    ) -> Result<Vec<Value>, ApiError> {
        let url = self.table_url(&table);
        debug!(table = %table, on_conflict = ?on_conflict, "Writing row");

        let mut request = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .header("Prefer", prefer)
            .json(&row);
        if let Some(columns) = on_conflict {
            request = request.query(&[("on_conflict", columns)]);
        }

        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        Self::read_rows(response).await
    }

    async fn patch_rows(&self, query: TableQuery, patch: Value) -> Result<Vec<Value>, ApiError> {
        let url = self.table_url(&query.table);
        debug!(table = %query.table, filters = query.filters.len(), "Updating rows");

        let response = self
            .client
            .patch(&url)
            .headers(self.auth_headers()?)
            .header("Prefer", PREFER_RETURN)
            .query(&query.filter_params())
            .json(&patch)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::read_rows(response).await
    }
}

impl Backend for ApiClient {
    fn select(&self, query: TableQuery) -> BackendFuture<'_, Vec<Value>> {
        Box::pin(self.get_rows(query))
    }

    fn insert(&self, table: &str, row: Value) -> BackendFuture<'_, Vec<Value>> {
        Box::pin(self.post_rows(table.to_string(), row, PREFER_RETURN, None))
    }

    fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> BackendFuture<'_, Vec<Value>> {
        Box::pin(self.post_rows(
            table.to_string(),
            row,
            PREFER_MERGE,
            Some(on_conflict.to_string()),
        ))
    }

    fn update(&self, query: TableQuery, patch: Value) -> BackendFuture<'_, Vec<Value>> {
        Box::pin(self.patch_rows(query, patch))
    }
}
