//! Temporal run identifier.

use chrono::{Duration, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::SeaIceError;

/// Identifies one pipeline execution and every artifact it produces.
///
/// The canonical string form is the ingestion date as `YYYYMMDD`. All
/// artifact names are derived from it, so two runs with the same key share
/// (and reuse) the same artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunKey(NaiveDate);

fn run_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{8}$").unwrap_or_else(|_| unreachable!()))
}

impl RunKey {
    /// Creates a run key for a calendar date.
    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The key for yesterday (UTC), which is the newest complete daily image.
    #[must_use]
    pub fn yesterday() -> Self {
        Self::days_before(Utc::now().date_naive(), 1)
    }

    /// The key `days` before `date`.
    #[must_use]
    pub fn days_before(date: NaiveDate, days: i64) -> Self {
        Self(date - Duration::days(days))
    }

    /// Returns the underlying date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

impl FromStr for RunKey {
    type Err = SeaIceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !run_key_pattern().is_match(s) {
            return Err(SeaIceError::Config(format!(
                "Run key '{s}' must be exactly eight digits (YYYYMMDD)"
            )));
        }
        NaiveDate::parse_from_str(s, "%Y%m%d")
            .map(Self)
            .map_err(|e| SeaIceError::Config(format!("Run key '{s}' is not a valid date: {e}")))
    }
}

impl Serialize for RunKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RunKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_compact_date() {
        let key = RunKey::from_date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(key.to_string(), "20240105");
    }

    #[test]
    fn test_parse_roundtrip() {
        let key: RunKey = "20231231".parse().unwrap();
        assert_eq!(key.date(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(key.to_string(), "20231231");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!("2023-12-31".parse::<RunKey>().is_err());
        assert!("2023123".parse::<RunKey>().is_err());
        assert!("20231332".parse::<RunKey>().is_err());
        assert!("".parse::<RunKey>().is_err());
    }

    #[test]
    fn test_days_before_crosses_month() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(RunKey::days_before(today, 1).to_string(), "20240229");
    }

    #[test]
    fn test_serde_uses_string_form() {
        let key: RunKey = "20240105".parse().unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#""20240105""#);

        let back: RunKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<RunKey>(r#""tomorrow""#).is_err());
    }
}
