//! Jornada core - the data layer behind the weekly family journal.
//!
//! This crate talks to the hosted table backend, caches query results in
//! memory with a time-to-live, and derives the views the journal shows:
//! metric trends, the 52-week journey map and the best week so far.

pub mod api;
pub mod autosave;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod insights;
pub mod models;
pub mod resources;
pub mod utils;

pub use api::{ApiClient, ApiError, Backend};
pub use cache::{Query, QueryCache, QueryError, QueryOptions, QueryState};
pub use config::{Config, ConfigError, Credentials};
pub use models::{Metric, NewCheckin, WeeklyCheckin, WEEKS_IN_JOURNEY};
