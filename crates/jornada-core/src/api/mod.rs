//! Client module for the hosted backend.
//!
//! This module provides the `ApiClient` for reading and writing the
//! journal tables over the backend's REST interface, along with the
//! `Backend` trait the cache and resource layers program against.
//!
//! Requests carry the project's anon key plus, when signed in, the
//! user's access token so row-level security scopes every table.

pub mod client;
pub mod error;
#[cfg(test)]
pub mod memory;
pub mod table;

pub use client::ApiClient;
pub use error::ApiError;
pub use table::{fetch_optional, fetch_rows, insert_row, upsert_row, Backend, BackendFuture, TableQuery};
