//! Shared test utilities.
//!
//! Setup helpers plus fake storage and notifier implementations used across
//! test modules.

#![cfg(test)]

use crate::alarm::{Notifier, NotifyError};
use crate::config::StoreConfig;
use crate::db::{migrations, Database, KeyValueStore, MemoryStore};
use crate::error::AppError;
use crate::models::{Priority, Repeat, ScheduleInstance};
use crate::store::ScheduleStore;
use chrono::{DateTime, TimeZone, Utc};
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::{tempdir, TempDir};

/// Create a temporary test database with migrations applied.
///
/// Returns a tuple of (Database, TempDir). The TempDir must be kept alive
/// for the duration of the test to prevent the database file from being deleted.
pub fn setup_test_db() -> (Database, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).expect("Failed to open test database");
    migrations::run(db.connection()).expect("Failed to run migrations on test DB");
    (db, dir)
}

/// Empty in-memory store with UTC calendar arithmetic and no notifier.
pub fn memory_store() -> ScheduleStore<MemoryStore> {
    ScheduleStore::open(MemoryStore::new(), None, StoreConfig::default()).expect("Failed to open memory store")
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid test timestamp")
}

/// A plain, non-recurring instance in category "1" with no alarm.
pub fn sample_instance(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> ScheduleInstance {
    ScheduleInstance {
        id: id.to_string(),
        title: format!("Schedule {id}"),
        description: None,
        start_time: start,
        end_time: end,
        category_id: "1".to_string(),
        priority: Priority::Medium,
        is_completed: false,
        repeat: Repeat::None,
        repeat_end_date: None,
        repeat_group_id: None,
        is_recurring: false,
        original_repeat: None,
        original_repeat_end_date: None,
        alarm_enabled: false,
        alarm_time: None,
        created_at: utc(2023, 12, 31, 0, 0),
        updated_at: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierCall {
    Schedule(String),
    Cancel(String),
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Working,
    Unavailable,
    Failing,
}

/// Notifier that records every call. Clones share one call log.
#[derive(Debug, Clone)]
pub struct RecordingNotifier {
    mode: Mode,
    calls: Rc<RefCell<Vec<NotifierCall>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::with_mode(Mode::Working)
    }

    /// Reports itself unavailable, as when permission was never granted.
    pub fn unavailable() -> Self {
        Self::with_mode(Mode::Unavailable)
    }

    /// Available, but every request fails.
    pub fn failing() -> Self {
        Self::with_mode(Mode::Failing)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<NotifierCall> {
        self.calls.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn is_available(&self) -> bool {
        !matches!(self.mode, Mode::Unavailable)
    }

    fn schedule(&self, instance: &ScheduleInstance) -> Result<String, NotifyError> {
        if matches!(self.mode, Mode::Failing) {
            return Err(NotifyError::Failed("scheduler offline".into()));
        }
        self.calls
            .borrow_mut()
            .push(NotifierCall::Schedule(instance.id.clone()));
        Ok(format!("n-{}", instance.id))
    }

    fn cancel(&self, schedule_id: &str) -> Result<(), NotifyError> {
        if matches!(self.mode, Mode::Failing) {
            return Err(NotifyError::Failed("scheduler offline".into()));
        }
        self.calls
            .borrow_mut()
            .push(NotifierCall::Cancel(schedule_id.to_string()));
        Ok(())
    }
}

/// Memory-backed storage whose writes can be switched to fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    pub fail_writes: bool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_writes: true,
        }
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(AppError::Storage(format!("write to '{key}' rejected")));
        }
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<bool, AppError> {
        if self.fail_writes {
            return Err(AppError::Storage(format!("remove of '{key}' rejected")));
        }
        self.inner.remove(key)
    }
}
