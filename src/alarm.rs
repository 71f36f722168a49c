//! Alarm registration on top of the platform's local-notification service.
//!
//! The platform side is abstracted as [`Notifier`]. Alarm calls are best-effort:
//! failures are logged and never fail the schedule operation that caused them.
//! If the notifier is missing or reports itself unavailable when the service is
//! built, that is logged once and every later alarm call is a no-op.

use crate::constants::ALARM_INFO_KEY;
use crate::db::{load_json, save_json, KeyValueStore};
use crate::error::AppError;
use crate::models::ScheduleInstance;
use crate::timestamp::iso8601;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("notification service unavailable: {0}")]
    Unavailable(String),

    #[error("notification request failed: {0}")]
    Failed(String),
}

/// Platform local-notification capability.
pub trait Notifier {
    /// Whether notifications can be delivered at all on this device.
    fn is_available(&self) -> bool {
        true
    }

    /// Schedule a notification for `instance`'s alarm time; returns the platform id.
    fn schedule(&self, instance: &ScheduleInstance) -> Result<String, NotifyError>;

    /// Cancel the notification registered for the schedule with id `schedule_id`.
    fn cancel(&self, schedule_id: &str) -> Result<(), NotifyError>;

    /// Replace the notification for `instance`.
    fn update(&self, instance: &ScheduleInstance) -> Result<String, NotifyError> {
        self.cancel(&instance.id)?;
        self.schedule(instance)
    }
}

/// What was registered for one schedule, persisted under `alarmInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmInfo {
    pub notification_id: String,
    #[serde(with = "iso8601")]
    pub alarm_time: DateTime<Utc>,
    pub schedule_title: String,
}

pub struct AlarmService {
    notifier: Option<Box<dyn Notifier>>,
    registered: BTreeMap<String, AlarmInfo>,
    /// Stored entries that failed to decode, kept until their schedule is
    /// registered or cancelled again.
    unreadable: BTreeMap<String, Value>,
    /// Cleared when the stored registry could not be read at all.
    writable: bool,
}

impl AlarmService {
    pub fn new(notifier: Option<Box<dyn Notifier>>) -> Self {
        let notifier = match notifier {
            Some(n) if n.is_available() => Some(n),
            Some(_) => {
                warn!("Notification service unavailable, alarms are disabled");
                None
            }
            None => {
                info!("No notification service configured, alarms are disabled");
                None
            }
        };
        Self {
            notifier,
            registered: BTreeMap::new(),
            unreadable: BTreeMap::new(),
            writable: true,
        }
    }

    /// Service with no notifier: every alarm call is a no-op.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    /// Restore the registry persisted by an earlier session.
    ///
    /// Entries that fail to decode are set aside and written back by
    /// [`persist`](Self::persist). If the registry cannot be read at all,
    /// persisting is disabled for this session so the stored copy survives.
    pub fn load<S: KeyValueStore + ?Sized>(&mut self, store: &S) -> Result<(), AppError> {
        let entries: BTreeMap<String, Value> = match load_json(store, ALARM_INFO_KEY) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                self.writable = false;
                return Err(e);
            }
        };

        self.registered.clear();
        self.unreadable.clear();
        for (schedule_id, value) in entries {
            match AlarmInfo::deserialize(&value) {
                Ok(info) => {
                    self.registered.insert(schedule_id, info);
                }
                Err(e) => {
                    warn!("Keeping unreadable alarm entry for {schedule_id} as stored: {e}");
                    self.unreadable.insert(schedule_id, value);
                }
            }
        }
        self.writable = true;

        debug!("Loaded {} registered alarms", self.registered.len());
        Ok(())
    }

    /// Whether [`persist`](Self::persist) will write.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn persist<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), AppError> {
        if !self.writable {
            debug!("Alarm registry was not restored, leaving stored copy untouched");
            return Ok(());
        }
        if self.unreadable.is_empty() {
            return save_json(store, ALARM_INFO_KEY, &self.registered);
        }

        let mut entries = self.unreadable.clone();
        for (schedule_id, info) in &self.registered {
            entries.insert(schedule_id.clone(), serde_json::to_value(info)?);
        }
        save_json(store, ALARM_INFO_KEY, &entries)
    }

    /// Register the alarm of `instance` if it has one. Returns whether a
    /// notification was scheduled.
    pub fn register(&mut self, instance: &ScheduleInstance) -> bool {
        let Some(notifier) = self.notifier.as_deref() else {
            return false;
        };
        let Some(alarm_time) = instance.active_alarm_time() else {
            return false;
        };

        match notifier.schedule(instance) {
            Ok(notification_id) => {
                debug!("Alarm for schedule {} set at {alarm_time}", instance.id);
                self.unreadable.remove(&instance.id);
                self.registered.insert(
                    instance.id.clone(),
                    AlarmInfo {
                        notification_id,
                        alarm_time,
                        schedule_title: instance.title.clone(),
                    },
                );
                true
            }
            Err(e) => {
                warn!("Failed to schedule alarm for {}: {e}", instance.id);
                false
            }
        }
    }

    /// Cancel the alarm registered for `schedule_id`, if any.
    pub fn cancel(&mut self, schedule_id: &str) -> bool {
        let Some(notifier) = self.notifier.as_deref() else {
            return false;
        };
        let was_registered = self.registered.remove(schedule_id).is_some();
        let was_unreadable = self.unreadable.remove(schedule_id).is_some();
        if !was_registered && !was_unreadable {
            return false;
        }

        if let Err(e) = notifier.cancel(schedule_id) {
            warn!("Failed to cancel alarm for {schedule_id}: {e}");
        }
        true
    }

    /// Bring the registration for `instance` in line with its current alarm
    /// settings: update it, create it, or cancel it.
    pub fn refresh(&mut self, instance: &ScheduleInstance) {
        let Some(notifier) = self.notifier.as_deref() else {
            return;
        };

        let Some(alarm_time) = instance.active_alarm_time() else {
            self.cancel(&instance.id);
            return;
        };
        if !self.registered.contains_key(&instance.id) {
            self.register(instance);
            return;
        }

        match notifier.update(instance) {
            Ok(notification_id) => {
                self.registered.insert(
                    instance.id.clone(),
                    AlarmInfo {
                        notification_id,
                        alarm_time,
                        schedule_title: instance.title.clone(),
                    },
                );
            }
            Err(e) => {
                warn!("Failed to update alarm for {}: {e}", instance.id);
                self.registered.remove(&instance.id);
            }
        }
    }

    pub fn info(&self, schedule_id: &str) -> Option<&AlarmInfo> {
        self.registered.get(schedule_id)
    }

    pub fn all(&self) -> &BTreeMap<String, AlarmInfo> {
        &self.registered
    }

    /// Registered alarms that have not fired yet as of `now`, soonest first.
    pub fn pending(&self, now: DateTime<Utc>) -> Vec<(&str, &AlarmInfo)> {
        let mut upcoming: Vec<_> = self
            .registered
            .iter()
            .filter(|(_, alarm)| alarm.alarm_time > now)
            .map(|(id, alarm)| (id.as_str(), alarm))
            .collect();
        upcoming.sort_by_key(|(_, alarm)| alarm.alarm_time);
        upcoming
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::test_utils::{sample_instance, utc, NotifierCall, RecordingNotifier};

    fn alarmed(id: &str) -> ScheduleInstance {
        let mut instance = sample_instance(id, utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0));
        instance.alarm_enabled = true;
        instance.alarm_time = Some(utc(2024, 1, 1, 8, 50));
        instance
    }

    #[test]
    fn test_register_records_info() {
        let notifier = RecordingNotifier::new();
        let mut service = AlarmService::new(Some(Box::new(notifier.clone())));

        assert!(service.register(&alarmed("a")));

        let info = service.info("a").unwrap();
        assert_eq!(info.alarm_time, utc(2024, 1, 1, 8, 50));
        assert_eq!(info.notification_id, "n-a");
        assert_eq!(notifier.calls(), vec![NotifierCall::Schedule("a".into())]);
    }

    #[test]
    fn test_register_skips_instances_without_alarm() {
        let notifier = RecordingNotifier::new();
        let mut service = AlarmService::new(Some(Box::new(notifier.clone())));
        let plain = sample_instance("p", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0));

        assert!(!service.register(&plain));
        assert!(notifier.calls().is_empty());
    }

    #[test]
    fn test_unavailable_notifier_disables_everything() {
        let notifier = RecordingNotifier::unavailable();
        let mut service = AlarmService::new(Some(Box::new(notifier.clone())));

        assert!(!service.is_enabled());
        assert!(!service.register(&alarmed("a")));
        assert!(!service.cancel("a"));
        assert!(notifier.calls().is_empty());
    }

    #[test]
    fn test_failed_schedule_is_not_recorded() {
        let notifier = RecordingNotifier::failing();
        let mut service = AlarmService::new(Some(Box::new(notifier)));

        assert!(!service.register(&alarmed("a")));
        assert!(service.info("a").is_none());
    }

    #[test]
    fn test_cancel_only_touches_registered_alarms() {
        let notifier = RecordingNotifier::new();
        let mut service = AlarmService::new(Some(Box::new(notifier.clone())));
        service.register(&alarmed("a"));

        assert!(service.cancel("a"));
        assert!(!service.cancel("never-registered"));
        assert_eq!(
            notifier.calls(),
            vec![NotifierCall::Schedule("a".into()), NotifierCall::Cancel("a".into())]
        );
    }

    #[test]
    fn test_refresh_follows_alarm_settings() {
        let notifier = RecordingNotifier::new();
        let mut service = AlarmService::new(Some(Box::new(notifier.clone())));
        let mut instance = alarmed("a");

        service.refresh(&instance);
        assert!(service.info("a").is_some());

        instance.alarm_time = Some(utc(2024, 1, 1, 8, 0));
        service.refresh(&instance);
        assert_eq!(service.info("a").unwrap().alarm_time, utc(2024, 1, 1, 8, 0));

        instance.alarm_enabled = false;
        service.refresh(&instance);
        assert!(service.info("a").is_none());
        assert_eq!(notifier.calls().last(), Some(&NotifierCall::Cancel("a".into())));
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let mut store = MemoryStore::new();
        let mut service = AlarmService::new(Some(Box::new(RecordingNotifier::new())));
        service.register(&alarmed("a"));
        service.persist(&mut store).unwrap();

        let raw = store.get(ALARM_INFO_KEY).unwrap().unwrap();
        assert!(raw.contains("\"notificationId\":\"n-a\""));

        let mut restored = AlarmService::disabled();
        restored.load(&store).unwrap();
        assert_eq!(restored.all(), service.all());
    }

    #[test]
    fn test_unreadable_entries_are_written_back() {
        let mut store = MemoryStore::new();
        store
            .set(
                ALARM_INFO_KEY,
                r#"{
                    "old": {"notificationId": "n-old", "alarmTime": "yesterday", "scheduleTitle": "Old"},
                    "b": {"notificationId": "n-b", "alarmTime": "2024-01-01T08:00:00.000Z", "scheduleTitle": "B"}
                }"#,
            )
            .unwrap();
        let mut service = AlarmService::new(Some(Box::new(RecordingNotifier::new())));

        service.load(&store).unwrap();
        assert_eq!(service.all().len(), 1);
        service.register(&alarmed("a"));
        service.persist(&mut store).unwrap();

        let raw: BTreeMap<String, Value> = load_json(&store, ALARM_INFO_KEY).unwrap().unwrap();
        let ids: Vec<_> = raw.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["a", "b", "old"]);
        assert_eq!(raw["old"]["alarmTime"], "yesterday");
    }

    #[test]
    fn test_cancel_clears_unreadable_entry() {
        let notifier = RecordingNotifier::new();
        let mut store = MemoryStore::new();
        store
            .set(ALARM_INFO_KEY, r#"{"old": {"notificationId": 7}}"#)
            .unwrap();
        let mut service = AlarmService::new(Some(Box::new(notifier.clone())));
        service.load(&store).unwrap();

        assert!(service.cancel("old"));
        service.persist(&mut store).unwrap();

        assert_eq!(notifier.calls(), vec![NotifierCall::Cancel("old".into())]);
        assert_eq!(store.get(ALARM_INFO_KEY).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_unreadable_registry_disables_persist() {
        let mut store = MemoryStore::new();
        store.set(ALARM_INFO_KEY, "42").unwrap();
        let mut service = AlarmService::new(Some(Box::new(RecordingNotifier::new())));

        assert!(service.load(&store).is_err());
        assert!(!service.is_writable());
        service.register(&alarmed("a"));
        service.persist(&mut store).unwrap();

        assert_eq!(store.get(ALARM_INFO_KEY).unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn test_pending_filters_and_orders() {
        let mut service = AlarmService::new(Some(Box::new(RecordingNotifier::new())));
        let mut later = alarmed("later");
        later.alarm_time = Some(utc(2024, 1, 3, 8, 0));
        let mut past = alarmed("past");
        past.alarm_time = Some(utc(2023, 12, 1, 8, 0));
        service.register(&later);
        service.register(&past);
        service.register(&alarmed("soon"));

        let ids: Vec<_> = service.pending(utc(2024, 1, 1, 0, 0)).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["soon", "later"]);
    }
}
