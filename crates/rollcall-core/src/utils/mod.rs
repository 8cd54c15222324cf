//! Utility functions for string formatting and manipulation.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    capitalize_each_word, cmp_ignore_case, contains_ignore_case, format_day_month, short_date,
    to_pascal_case, truncate,
};
