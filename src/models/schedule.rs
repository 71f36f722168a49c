use crate::timestamp::{iso8601, iso8601_option};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurrence rule of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Repeat {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Repeat {
    pub fn as_str(self) -> &'static str {
        match self {
            Repeat::None => "NONE",
            Repeat::Daily => "DAILY",
            Repeat::Weekly => "WEEKLY",
            Repeat::Monthly => "MONTHLY",
            Repeat::Yearly => "YEARLY",
        }
    }

    pub fn is_recurring(self) -> bool {
        !matches!(self, Repeat::None)
    }
}

impl FromStr for Repeat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(Repeat::None),
            "DAILY" => Ok(Repeat::Daily),
            "WEEKLY" => Ok(Repeat::Weekly),
            "MONTHLY" => Ok(Repeat::Monthly),
            "YEARLY" => Ok(Repeat::Yearly),
            other => Err(format!("unknown repeat rule '{other}'")),
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete, dated occurrence of a schedule.
///
/// Serialized with camelCase keys and ISO-8601 timestamps, which is the layout
/// of the persisted `schedules` blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInstance {
    /// Unique per instance, not per logical schedule.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "iso8601")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub end_time: DateTime<Utc>,
    pub category_id: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub repeat: Repeat,
    /// End date of the recurrence as submitted; `None` means the default horizon.
    #[serde(default, with = "iso8601_option")]
    pub repeat_end_date: Option<DateTime<Utc>>,
    /// Shared by every instance materialized from one recurrence rule.
    #[serde(default)]
    pub repeat_group_id: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    /// Rule of the submission this instance came from, kept for group-aware edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_repeat: Option<Repeat>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "iso8601_option")]
    pub original_repeat_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub alarm_enabled: bool,
    /// Always earlier than `start_time` when set.
    #[serde(default, with = "iso8601_option")]
    pub alarm_time: Option<DateTime<Utc>>,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "iso8601_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScheduleInstance {
    pub fn duration(&self) -> TimeDelta {
        self.end_time - self.start_time
    }

    /// A stored record is usable only if it ends after it starts.
    pub fn is_well_formed(&self) -> bool {
        self.end_time > self.start_time
    }

    /// Alarm instant, if the alarm is switched on and has a time.
    pub fn active_alarm_time(&self) -> Option<DateTime<Utc>> {
        if self.alarm_enabled {
            self.alarm_time
        } else {
            None
        }
    }

    /// Lead time between the alarm and the start of the schedule.
    pub fn alarm_offset(&self) -> Option<TimeDelta> {
        self.active_alarm_time().map(|alarm| self.start_time - alarm)
    }

    pub fn belongs_to_group(&self, group_id: &str) -> bool {
        self.repeat_group_id.as_deref() == Some(group_id)
    }

    /// Inclusive interval overlap with `[window_start, window_end]`.
    pub fn overlaps(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
        self.start_time <= window_end && self.end_time >= window_start
    }

    /// Case-insensitive substring match on title or description.
    /// `needle` must already be lowercase.
    pub fn matches_term(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}
