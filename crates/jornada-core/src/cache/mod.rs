//! In-memory query cache.
//!
//! This module provides the `QueryCache` shared by every view and the
//! `Query` handle each view holds. Values are kept for a time-to-live
//! (5 minutes by default) and checked for staleness when read.
//!
//! Keys are built by the caller from a resource name and a scoping id,
//! e.g. `weekly-checkins-<user id>`. Writes made elsewhere are not seen
//! until the key is invalidated or refetched.

pub mod query;
pub mod store;

use thiserror::Error;

use crate::api::ApiError;

pub use query::{Query, QueryOptions, QueryState};
pub use store::{CachedData, QueryCache, DEFAULT_TTL_MINUTES};

/// Failure surfaced to a view. Clonable so every waiter on a shared
/// fetch receives it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ApiError> for QueryError {
    fn from(err: ApiError) -> Self {
        Self::new(err.to_string())
    }
}
