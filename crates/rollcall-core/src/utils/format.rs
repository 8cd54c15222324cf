use std::cmp::Ordering;

use chrono::NaiveDate;

/// Compare two strings case-insensitively without allocating.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Check whether `haystack` contains `needle_lower`.
/// The needle must already be lowercase.
pub fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Convert a name like "rAHUL kumar" into "Rahul Kumar".
pub fn to_pascal_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-case the first letter of each word, leaving the rest untouched.
/// Enrollment numbers keep their digit/letter casing this way.
pub fn capitalize_each_word(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a date as "19 Oct" for day rows
pub fn format_day_month(date: NaiveDate) -> String {
    date.format("%-d %b").to_string()
}

/// ISO short date used as the key of attendance mappings
pub fn short_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
