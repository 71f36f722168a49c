// src/dtos.rs
//
// Request types handed to the store by the UI layer.

use crate::models::{Priority, Repeat, ScheduleInstance};
use crate::timestamp::{iso8601, iso8601_option, normalize};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A schedule as submitted by the user, before recurrence expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDraft {
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
    pub repeat: Repeat,
    #[serde(default, with = "iso8601_option")]
    pub repeat_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub alarm_enabled: bool,
    #[serde(default, with = "iso8601_option")]
    pub alarm_time: Option<DateTime<Utc>>,
}

impl ScheduleDraft {
    pub fn new(title: &str, category_id: &str, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            start_time,
            end_time,
            category_id: category_id.to_string(),
            priority: Priority::default(),
            repeat: Repeat::None,
            repeat_end_date: None,
            alarm_enabled: false,
            alarm_time: None,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Repeat by `rule` until the end of `until`'s day, or the default horizon.
    pub fn repeat(mut self, rule: Repeat, until: Option<DateTime<Utc>>) -> Self {
        self.repeat = rule;
        self.repeat_end_date = until;
        self
    }

    /// Enable the alarm `minutes` before the start time.
    pub fn alarm_minutes_before(mut self, minutes: u32) -> Self {
        self.alarm_enabled = true;
        self.alarm_time = Some(self.start_time - TimeDelta::minutes(i64::from(minutes)));
        self
    }

    /// Lead time of the alarm, preserved across every expanded instance.
    pub fn alarm_offset(&self) -> Option<TimeDelta> {
        if self.alarm_enabled {
            self.alarm_time.map(|alarm| self.start_time - alarm)
        } else {
            None
        }
    }

    /// Trimmed title and description, timestamps at storage precision, and no
    /// end date on a non-repeating draft.
    pub fn normalized(&self) -> Self {
        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Self {
            title: self.title.trim().to_string(),
            description,
            start_time: normalize(self.start_time),
            end_time: normalize(self.end_time),
            category_id: self.category_id.clone(),
            priority: self.priority,
            repeat: self.repeat,
            repeat_end_date: if self.repeat.is_recurring() {
                self.repeat_end_date.map(normalize)
            } else {
                None
            },
            alarm_enabled: self.alarm_enabled,
            alarm_time: if self.alarm_enabled {
                self.alarm_time.map(normalize)
            } else {
                None
            },
        }
    }
}

/// Partial update of a single instance. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(with = "iso8601_option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(with = "iso8601_option")]
    pub end_time: Option<DateTime<Utc>>,
    pub category_id: Option<String>,
    pub priority: Option<Priority>,
    pub is_completed: Option<bool>,
    pub alarm_enabled: Option<bool>,
    #[serde(with = "iso8601_option")]
    pub alarm_time: Option<DateTime<Utc>>,
}

impl SchedulePatch {
    pub fn completed(is_completed: bool) -> Self {
        Self {
            is_completed: Some(is_completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into `instance`.
    ///
    /// Moving the start without a new end keeps the duration; moving it without
    /// a new alarm time keeps the alarm lead time. Turning the alarm off clears
    /// the alarm time.
    pub fn apply_to(&self, instance: &mut ScheduleInstance, now: DateTime<Utc>) {
        let previous_duration = instance.duration();
        let previous_offset = instance.alarm_offset();

        if let Some(title) = &self.title {
            instance.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            let trimmed = description.trim();
            instance.description = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(start) = self.start_time {
            instance.start_time = normalize(start);
            if self.end_time.is_none() {
                instance.end_time = instance.start_time + previous_duration;
            }
        }
        if let Some(end) = self.end_time {
            instance.end_time = normalize(end);
        }
        if let Some(category_id) = &self.category_id {
            instance.category_id.clone_from(category_id);
        }
        if let Some(priority) = self.priority {
            instance.priority = priority;
        }
        if let Some(is_completed) = self.is_completed {
            instance.is_completed = is_completed;
        }
        if let Some(alarm_enabled) = self.alarm_enabled {
            instance.alarm_enabled = alarm_enabled;
        }

        match (self.alarm_time, self.start_time, previous_offset) {
            (Some(alarm), _, _) => instance.alarm_time = Some(normalize(alarm)),
            (None, Some(_), Some(offset)) => instance.alarm_time = Some(instance.start_time - offset),
            (None, _, _) => {}
        }
        if !instance.alarm_enabled {
            instance.alarm_time = None;
        }

        instance.updated_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_instance, utc};

    #[test]
    fn test_draft_builder() {
        let draft = ScheduleDraft::new("Standup", "1", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 9, 15))
            .description("daily sync")
            .priority(Priority::High)
            .repeat(Repeat::Daily, Some(utc(2024, 1, 5, 0, 0)))
            .alarm_minutes_before(10);

        assert_eq!(draft.priority, Priority::High);
        assert_eq!(draft.repeat, Repeat::Daily);
        assert_eq!(draft.alarm_time, Some(utc(2024, 1, 1, 8, 50)));
        assert_eq!(draft.alarm_offset(), Some(TimeDelta::minutes(10)));
    }

    #[test]
    fn test_normalized_trims_and_drops_stale_fields() {
        let mut draft = ScheduleDraft::new("  Lunch  ", "2", utc(2024, 1, 1, 12, 0), utc(2024, 1, 1, 13, 0))
            .description("   ");
        draft.repeat_end_date = Some(utc(2024, 2, 1, 0, 0));
        draft.alarm_time = Some(utc(2024, 1, 1, 11, 0));

        let normalized = draft.normalized();
        assert_eq!(normalized.title, "Lunch");
        assert!(normalized.description.is_none());
        assert!(normalized.repeat_end_date.is_none());
        assert!(normalized.alarm_time.is_none());
    }

    #[test]
    fn test_draft_deserializes_from_form_json() {
        let json = r#"{
            "title": "Gym",
            "startTime": "2024-01-01T18:00:00.000Z",
            "endTime": "2024-01-01T19:00:00.000Z",
            "categoryId": "2",
            "repeat": "WEEKLY",
            "repeatEndDate": null,
            "priority": "LOW",
            "alarmEnabled": true,
            "alarmTime": "2024-01-01T17:30:00.000Z"
        }"#;
        let draft: ScheduleDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.repeat, Repeat::Weekly);
        assert_eq!(draft.alarm_offset(), Some(TimeDelta::minutes(30)));
    }

    #[test]
    fn test_patch_completed() {
        let mut instance = sample_instance("a", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0));
        let now = utc(2024, 1, 1, 11, 0);

        SchedulePatch::completed(true).apply_to(&mut instance, now);

        assert!(instance.is_completed);
        assert_eq!(instance.updated_at, Some(now));
        assert_eq!(instance.start_time, utc(2024, 1, 1, 9, 0));
    }

    #[test]
    fn test_patch_moving_start_keeps_duration_and_alarm_lead() {
        let mut instance = sample_instance("a", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 30));
        instance.alarm_enabled = true;
        instance.alarm_time = Some(utc(2024, 1, 1, 8, 55));

        let patch = SchedulePatch {
            start_time: Some(utc(2024, 1, 2, 14, 0)),
            ..SchedulePatch::default()
        };
        patch.apply_to(&mut instance, utc(2024, 1, 1, 0, 0));

        assert_eq!(instance.end_time, utc(2024, 1, 2, 15, 30));
        assert_eq!(instance.alarm_time, Some(utc(2024, 1, 2, 13, 55)));
    }

    #[test]
    fn test_patch_disabling_alarm_clears_time() {
        let mut instance = sample_instance("a", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0));
        instance.alarm_enabled = true;
        instance.alarm_time = Some(utc(2024, 1, 1, 8, 0));

        let patch = SchedulePatch {
            alarm_enabled: Some(false),
            ..SchedulePatch::default()
        };
        patch.apply_to(&mut instance, utc(2024, 1, 1, 0, 0));

        assert!(!instance.alarm_enabled);
        assert!(instance.alarm_time.is_none());
    }

    #[test]
    fn test_patch_empty_description_clears_it() {
        let mut instance = sample_instance("a", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0));
        instance.description = Some("old".into());

        let patch = SchedulePatch {
            description: Some(String::new()),
            ..SchedulePatch::default()
        };
        assert!(!patch.is_empty());
        patch.apply_to(&mut instance, utc(2024, 1, 1, 0, 0));

        assert!(instance.description.is_none());
        assert!(SchedulePatch::default().is_empty());
    }
}
