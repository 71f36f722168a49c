//! Timestamp parsing, formatting and calendar-day arithmetic.
//!
//! Every instant that enters the crate from text goes through [`parse_timestamp`],
//! and every instant written back out goes through [`format_timestamp`]. Stored
//! values use the ISO-8601 shape `2024-01-01T09:00:00.000Z` with millisecond
//! precision, so instants are truncated to milliseconds before they are kept.

use crate::error::AppError;
use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, SubsecRound, TimeDelta, Utc};

/// Parse an RFC 3339 / ISO-8601 timestamp into a UTC instant.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidTimestamp {
            value: value.to_string(),
            reason: "empty value".into(),
        });
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Format an instant the way it is persisted.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Drop sub-millisecond precision so the value survives a storage round-trip.
pub fn normalize(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(3)
}

/// Current instant, at storage precision.
pub fn now() -> DateTime<Utc> {
    normalize(Utc::now())
}

/// Calendar date of `instant` as seen from `offset`.
pub fn local_date(instant: &DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// First instant (00:00:00.000 local) of `date`.
pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = date.and_time(NaiveTime::MIN);
    (local_midnight - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

/// Last instant (23:59:59.999 local) of `date`.
pub fn end_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    match date.checked_add_days(Days::new(1)) {
        Some(next) => start_of_day(next, offset) - TimeDelta::milliseconds(1),
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// Serde adapter for required timestamp fields.
pub mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for nullable timestamp fields. Pair with `#[serde(default)]`.
pub mod iso8601_option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_some(&super::format_timestamp(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => super::parse_timestamp(&raw).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
