//! The schedule store: sole owner of the in-memory schedule and category
//! collections.
//!
//! Every mutation builds the next collection, writes it to storage as one JSON
//! blob, and only then swaps it into memory. A failed write leaves memory as it
//! was, so memory never runs ahead of durable state. Alarm side effects come
//! after the write and are best-effort.

mod categories;

use crate::alarm::{AlarmInfo, AlarmService, Notifier};
use crate::config::StoreConfig;
use crate::constants::{CATEGORIES_KEY, SCHEDULES_KEY};
use crate::db::{load_records, save_records, KeyValueStore, Records};
use crate::dtos::{SchedulePatch, ScheduleDraft};
use crate::error::AppError;
use crate::models::{Category, ScheduleInstance};
use crate::query::{self, DateWindow, DayMarker, ViewMode};
use crate::recurrence;
use crate::timestamp;
use crate::validation::{validate_draft, validate_instance};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;

pub struct ScheduleStore<S: KeyValueStore> {
    storage: S,
    config: StoreConfig,
    alarms: AlarmService,
    schedules: Vec<ScheduleInstance>,
    categories: Vec<Category>,
    /// Stored elements that failed to decode, written back on every save.
    unreadable_schedules: Vec<Value>,
    unreadable_categories: Vec<Value>,
}

impl<S: KeyValueStore> ScheduleStore<S> {
    /// Load schedules, categories and alarm registrations from `storage`.
    ///
    /// Missing categories fall back to the defaults. Records that fail to
    /// decode are hidden with a warning but stay in storage untouched.
    pub fn open(storage: S, notifier: Option<Box<dyn Notifier>>, config: StoreConfig) -> Result<Self, AppError> {
        config.validate()?;

        let schedules: Records<ScheduleInstance> = load_records(&storage, SCHEDULES_KEY)?.unwrap_or_default();
        let categories = load_records(&storage, CATEGORIES_KEY)?.unwrap_or_else(|| Records {
            records: Category::defaults(),
            unreadable: Vec::new(),
        });

        let mut alarms = AlarmService::new(notifier);
        if let Err(e) = alarms.load(&storage) {
            warn!("Could not restore alarm registrations, leaving the stored copy untouched: {e}");
        }

        info!(
            "Schedule store opened: {} schedules, {} categories",
            schedules.records.len(),
            categories.records.len()
        );

        Ok(Self {
            storage,
            config,
            alarms,
            schedules: schedules.records,
            categories: categories.records,
            unreadable_schedules: schedules.unreadable,
            unreadable_categories: categories.unreadable,
        })
    }

    pub fn schedules(&self) -> &[ScheduleInstance] {
        &self.schedules
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn alarms(&self) -> &AlarmService {
        &self.alarms
    }

    pub fn get(&self, id: &str) -> Option<&ScheduleInstance> {
        self.schedules.iter().find(|s| s.id == id)
    }

    /// Validate and expand `draft`, persist the new instances alongside the
    /// existing ones, then register their alarms.
    ///
    /// Checks run on the draft at storage precision, so a range that only
    /// exists below a millisecond is rejected rather than stored empty.
    pub fn create(&mut self, draft: &ScheduleDraft) -> Result<Vec<ScheduleInstance>, AppError> {
        let draft = draft.normalized();
        validate_draft(&draft, &self.categories)?;

        let created = recurrence::expand(&draft, &self.config, timestamp::now());

        let mut next = Vec::with_capacity(self.schedules.len() + created.len());
        next.extend(self.schedules.iter().cloned());
        next.extend(created.iter().cloned());
        self.commit_schedules(next)?;

        for instance in &created {
            self.alarms.register(instance);
        }
        self.persist_alarms();

        info!("Created schedule '{}' ({} instances)", draft.title, created.len());
        Ok(created)
    }

    /// Merge `patch` into the single instance `id`. Other instances of its
    /// recurrence group are left alone.
    pub fn update(&mut self, id: &str, patch: &SchedulePatch) -> Result<ScheduleInstance, AppError> {
        let index = self
            .schedules
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| not_found(id))?;

        let mut next = self.schedules.clone();
        let Some(target) = next.get_mut(index) else {
            return Err(not_found(id));
        };
        patch.apply_to(target, timestamp::now());
        validate_instance(target, &self.categories)?;
        let updated = target.clone();

        self.commit_schedules(next)?;

        self.alarms.refresh(&updated);
        self.persist_alarms();

        debug!("Updated schedule {id}");
        Ok(updated)
    }

    pub fn set_completed(&mut self, id: &str, is_completed: bool) -> Result<ScheduleInstance, AppError> {
        self.update(id, &SchedulePatch::completed(is_completed))
    }

    /// Remove instance `id`, or with `cascade_group` every instance of its
    /// recurrence group. Returns the removed instances.
    pub fn delete(&mut self, id: &str, cascade_group: bool) -> Result<Vec<ScheduleInstance>, AppError> {
        let target = self.get(id).ok_or_else(|| not_found(id))?;

        let group_id = if cascade_group {
            target.repeat_group_id.clone()
        } else {
            None
        };

        let (removed, kept): (Vec<_>, Vec<_>) = self.schedules.iter().cloned().partition(|s| match &group_id {
            Some(group) => s.belongs_to_group(group),
            None => s.id == id,
        });

        self.commit_removal(kept, &removed)?;

        info!("Deleted {} schedule instance(s) starting from {id}", removed.len());
        Ok(removed)
    }

    /// Remove every instance sharing `group_id`.
    pub fn delete_group(&mut self, group_id: &str) -> Result<Vec<ScheduleInstance>, AppError> {
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .schedules
            .iter()
            .cloned()
            .partition(|s| s.belongs_to_group(group_id));

        if removed.is_empty() {
            return Err(AppError::NotFound {
                entity: "Recurrence group",
                id: group_id.to_string(),
            });
        }

        self.commit_removal(kept, &removed)?;

        info!("Deleted recurrence group {group_id} ({} instances)", removed.len());
        Ok(removed)
    }

    pub fn group(&self, group_id: &str) -> Vec<&ScheduleInstance> {
        self.schedules
            .iter()
            .filter(|s| s.belongs_to_group(group_id))
            .collect()
    }

    /// Instances visible in the `mode` view around `anchor`.
    pub fn query(&self, mode: ViewMode, anchor: NaiveDate) -> Vec<ScheduleInstance> {
        query::query(&self.schedules, mode, anchor, self.config.offset())
    }

    pub fn window(&self, mode: ViewMode, anchor: NaiveDate) -> DateWindow {
        DateWindow::for_view(mode, anchor, self.config.offset())
    }

    pub fn search(&self, term: &str) -> Vec<ScheduleInstance> {
        query::search(&self.schedules, term)
    }

    /// Instances starting on the local day `date`.
    pub fn schedules_on(&self, date: NaiveDate) -> Vec<ScheduleInstance> {
        query::starting_on(&self.schedules, date, self.config.offset())
    }

    pub fn schedules_in_category(&self, category_id: &str) -> Vec<ScheduleInstance> {
        self.schedules
            .iter()
            .filter(|s| s.category_id == category_id)
            .cloned()
            .collect()
    }

    /// Calendar dots for the month containing `anchor`.
    pub fn marked_days(&self, anchor: NaiveDate) -> BTreeMap<NaiveDate, Vec<DayMarker>> {
        let window = self.window(ViewMode::Monthly, anchor);
        query::marked_days(&self.schedules, &self.categories, &window, self.config.offset())
    }

    /// Alarms still due after `now`, soonest first.
    pub fn pending_alarms(&self, now: DateTime<Utc>) -> Vec<(&str, &AlarmInfo)> {
        self.alarms.pending(now)
    }

    fn commit_schedules(&mut self, next: Vec<ScheduleInstance>) -> Result<(), AppError> {
        save_records(&mut self.storage, SCHEDULES_KEY, &next, &self.unreadable_schedules)?;
        self.schedules = next;
        Ok(())
    }

    fn commit_removal(&mut self, kept: Vec<ScheduleInstance>, removed: &[ScheduleInstance]) -> Result<(), AppError> {
        self.commit_schedules(kept)?;

        for instance in removed {
            self.alarms.cancel(&instance.id);
        }
        self.persist_alarms();
        Ok(())
    }

    fn commit_categories(&mut self, next: Vec<Category>) -> Result<(), AppError> {
        save_records(&mut self.storage, CATEGORIES_KEY, &next, &self.unreadable_categories)?;
        self.categories = next;
        Ok(())
    }

    fn persist_alarms(&mut self) {
        if !self.alarms.is_enabled() {
            return;
        }
        if let Err(e) = self.alarms.persist(&mut self.storage) {
            warn!("Failed to persist alarm registrations: {e}");
        }
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound {
        entity: "Schedule",
        id: id.to_string(),
    }
}
