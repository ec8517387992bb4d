//! `Revision` - the persisted, trusted record of what is applied in a namespace

use crate::executor::DbError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The current revision of one namespace as stored by the persistence layer
///
/// Mirrors the applied [`RevisionModule`](crate::revision::RevisionModule) minus its
/// operations. Timestamps are owned by the persistence layer and are `None` for revisions
/// built in memory from a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Revision file name (no directory part)
    pub file: String,

    pub version: String,

    /// `None` for the first revision of the chain
    pub previous_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Revision {
    #[must_use]
    pub fn new(
        file: impl Into<String>,
        version: impl Into<String>,
        previous_version: Option<String>,
    ) -> Self {
        Self {
            file: file.into(),
            version: version.into(),
            previous_version,
            created_at: None,
            updated_at: None,
        }
    }

    /// Whether this is the first revision of its chain
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.previous_version.is_none()
    }

    /// Create a `Revision` from a state table row
    ///
    /// Expected column order: `file`, `version`, `previous_version`, `created_at::text`,
    /// `updated_at::text`.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Parse` if a timestamp cannot be parsed.
    pub fn from_row(row: &may_postgres::Row) -> Result<Self, DbError> {
        let file: String = row.get(0);
        let version: String = row.get(1);
        let previous_version: Option<String> = row.get(2);
        let created_at: Option<String> = row.get(3);
        let updated_at: Option<String> = row.get(4);

        Ok(Self {
            file,
            version,
            previous_version,
            created_at: created_at.as_deref().map(parse_timestamp).transpose()?,
            updated_at: updated_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

/// Parse a `PostgreSQL` `TIMESTAMP` rendered as text
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DbError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            DbError::Parse(format!(
                "Failed to parse timestamp '{value}': unrecognized format"
            ))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_timestamp_formats() {
        let ts = parse_timestamp("2024-01-20 12:00:00.123456").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 1, 20));
        assert_eq!(ts.hour(), 12);

        assert!(parse_timestamp("2024-01-20 12:00:00").is_ok());
        assert!(parse_timestamp("2024-01-20T12:00:00.5").is_ok());
        assert!(parse_timestamp("2024-01-20T12:00:00").is_ok());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(err.to_string().contains("unrecognized format"));
    }

    #[test]
    fn test_serialization_omits_missing_timestamps() {
        let revision = Revision::new("001_init.revision.toml", "abc", None);
        let serialized = toml::to_string(&revision).unwrap();
        assert!(!serialized.contains("created_at"));
        assert!(revision.is_root());
    }
}
