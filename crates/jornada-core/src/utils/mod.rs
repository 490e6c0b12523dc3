//! Utility functions for display formatting.

pub mod format;

pub use format::{format_date, format_timestamp, score_bar, truncate_string};
