//! Naming of newly generated revision files

use chrono::{DateTime, Utc};

/// Longest slug kept in a generated file name
pub const MAX_SLUG_LEN: usize = 50;

/// Timestamp prefix of generated file names (`YYYYMMDDHHMMSS`)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Lowercase `description`, replace every character outside `[a-z0-9]` with `-` and keep
/// at most [`MAX_SLUG_LEN`] characters
///
/// # Example
/// - `Add users table!` → `add-users-table-`
pub fn slugify(description: &str) -> String {
    description
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .take(MAX_SLUG_LEN)
        .collect()
}

/// `<YYYYMMDDHHMMSS>_<slug>.revision.<extension>`
pub fn file_name(description: &str, extension: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "{}_{}.revision.{}",
        timestamp.format(TIMESTAMP_FORMAT),
        slugify(description),
        extension.trim_start_matches('.')
    )
}
