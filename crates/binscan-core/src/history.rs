//! Scan records and the append-only scan history.
//!
//! The history is written once per accepted scan and read back only for
//! display. Nothing in the scan pipeline consults it.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{BinscanError, Result};
use crate::geo::Coordinate;
use crate::storage::{Storage, SCAN_HISTORY_KEY};

/// Stored in place of a code when a record carries none.
pub const NO_CODE: &str = "N/A";

/// Default pattern for the human-readable scan timestamp.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One accepted scan: where, when, and which code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "01936b2e-8f5a-7c3d-9e1f-2a3b4c5d6e7f",
    "position": {"latitude": 13.7367, "longitude": 100.5231},
    "timestamp": "2025-01-15 10:30:00",
    "recorded_at_utc": "2025-01-15T03:30:00Z",
    "code": "BIN-001"
}))]
pub struct ScanRecord {
    /// Record id (UUID v7, time ordered).
    pub id: Uuid,

    /// Where the scan happened.
    pub position: Coordinate,

    /// Local time of the scan, formatted for display.
    #[schema(example = "2025-01-15 10:30:00")]
    pub timestamp: String,

    /// Exact time of the scan.
    pub recorded_at_utc: DateTime<Utc>,

    /// Scanned code; serialized as `"N/A"` when absent.
    #[serde(with = "code_serde")]
    #[schema(value_type = String, example = "BIN-001")]
    pub code: Option<String>,
}

impl ScanRecord {
    /// Create a record stamped at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp style cannot render `now`.
    pub fn new(
        position: Coordinate,
        code: Option<String>,
        now: DateTime<Utc>,
        style: &TimestampStyle,
    ) -> Result<Self> {
        Ok(Self {
            id: Uuid::now_v7(),
            position,
            timestamp: style.render(now)?,
            recorded_at_utc: now,
            code,
        })
    }

    /// Code as displayed, with the `"N/A"` sentinel for a missing code.
    #[must_use]
    pub fn code_or_sentinel(&self) -> &str {
        self.code.as_deref().unwrap_or(NO_CODE)
    }
}

mod code_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::NO_CODE;

    pub fn serialize<S>(code: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(code.as_deref().unwrap_or(NO_CODE))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok((s != NO_CODE).then_some(s))
    }
}

/// How scan timestamps are rendered: a timezone and a strftime pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampStyle {
    timezone: Tz,
    pattern: String,
}

impl Default for TimestampStyle {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            pattern: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl TimestampStyle {
    /// Create a style.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::ConfigValidationError`] if `pattern` is not a
    /// valid strftime pattern.
    pub fn new(timezone: Tz, pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if !is_valid_timestamp_pattern(&pattern) {
            return Err(BinscanError::ConfigValidationError(format!(
                "timestamp format '{pattern}' is not a valid strftime pattern"
            )));
        }
        Ok(Self { timezone, pattern })
    }

    /// Render `at` in this style's timezone.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::PersistenceError`] if formatting fails.
    pub fn render(&self, at: DateTime<Utc>) -> Result<String> {
        let local = at.with_timezone(&self.timezone);
        let mut out = String::new();
        write!(out, "{}", local.format(&self.pattern)).map_err(|_| {
            BinscanError::PersistenceError(format!(
                "Cannot format timestamp with pattern '{}'",
                self.pattern
            ))
        })?;
        Ok(out)
    }
}

/// Whether `pattern` parses as a strftime pattern.
#[must_use]
pub fn is_valid_timestamp_pattern(pattern: &str) -> bool {
    use chrono::format::{Item, StrftimeItems};
    !pattern.is_empty() && StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error))
}

/// Append-only scan log persisted under [`SCAN_HISTORY_KEY`].
#[derive(Debug, Clone)]
pub struct HistoryStore {
    storage: Storage,
}

impl HistoryStore {
    /// Create a history store on top of `storage`.
    #[must_use]
    pub const fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Append a record to the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be written.
    pub fn append(&self, record: &ScanRecord) -> Result<()> {
        self.storage.append(SCAN_HISTORY_KEY, record)?;
        tracing::info!(
            id = %record.id,
            code = record.code_or_sentinel(),
            "Appended scan to history"
        );
        Ok(())
    }

    /// All records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the log exists but cannot be read.
    pub fn load(&self) -> Result<Vec<ScanRecord>> {
        self.storage.read_log(SCAN_HISTORY_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn position() -> Coordinate {
        Coordinate::new(13.7367, 100.5231).unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 3, 30, 0).unwrap()
    }

    #[test]
    fn test_timestamp_in_configured_timezone() {
        let style = TimestampStyle::new(chrono_tz::Asia::Bangkok, DEFAULT_TIMESTAMP_FORMAT).unwrap();
        let record = ScanRecord::new(position(), Some("BIN-001".into()), at(), &style).unwrap();
        assert_eq!(record.timestamp, "2025-01-15 10:30:00");
        assert_eq!(record.recorded_at_utc, at());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(TimestampStyle::new(chrono_tz::UTC, "%Y-%m-%").is_err());
        assert!(TimestampStyle::new(chrono_tz::UTC, "").is_err());
        assert!(is_valid_timestamp_pattern("%d/%m/%Y %H:%M"));
    }

    #[test]
    fn test_missing_code_uses_sentinel() {
        let record = ScanRecord::new(position(), None, at(), &TimestampStyle::default()).unwrap();
        assert_eq!(record.code_or_sentinel(), "N/A");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["code"], "N/A");

        let back: ScanRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.code, None);
    }

    #[test]
    fn test_history_is_append_only_log() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryStore::new(Storage::new(dir.path().to_path_buf()));
        assert!(history.load().unwrap().is_empty());

        let style = TimestampStyle::default();
        let first = ScanRecord::new(position(), Some("BIN-001".into()), at(), &style).unwrap();
        let second = ScanRecord::new(position(), None, at(), &style).unwrap();
        history.append(&first).unwrap();
        history.append(&second).unwrap();

        let loaded = history.load().unwrap();
        assert_eq!(loaded, vec![first, second]);
    }
}
