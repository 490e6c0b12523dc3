use chrono::{DateTime, Local, NaiveDate};

/// Truncate a string to a maximum length in characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a date as `dd/mm/yyyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Format a backend timestamp for display in local time.
/// Returns the input unchanged if it isn't RFC 3339.
pub fn format_timestamp(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

/// Horizontal bar for a 1-10 score, e.g. `███████░░░`
pub fn score_bar(value: u8, max: u8) -> String {
    let filled = value.min(max) as usize;
    let empty = max as usize - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Conexão familiar", 7), "Cone...");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 8).unwrap();
        assert_eq!(format_date(date), "08/02/2024");
    }

    #[test]
    fn test_format_timestamp_passthrough() {
        assert_eq!(format_timestamp("not a date"), "not a date");
        assert_eq!(format_timestamp("2024-02-08T19:30:00Z").len(), 16);
    }

    #[test]
    fn test_score_bar() {
        assert_eq!(score_bar(3, 10), "███░░░░░░░");
        assert_eq!(score_bar(12, 10), "██████████");
        assert_eq!(score_bar(0, 4), "░░░░");
    }
}
