//! Recurrence expansion.
//!
//! A draft with a repeat rule is materialized into concrete instances up front,
//! one per period, until the horizon or the instance cap is reached. The n-th
//! occurrence is always computed from the first one (start + n periods in local
//! wall-clock time), so month-end clamping never accumulates drift: a schedule
//! on Jan 31 lands on Feb 29, then Mar 31.

use crate::config::StoreConfig;
use crate::dtos::ScheduleDraft;
use crate::models::{Repeat, ScheduleInstance};
use crate::timestamp::{end_of_day, local_date};
use chrono::{DateTime, Days, FixedOffset, Months, TimeDelta, Utc};
use log::{debug, info};
use uuid::Uuid;

/// Expand `draft` into its instances, assigning fresh instance and group ids.
pub fn expand(draft: &ScheduleDraft, config: &StoreConfig, now: DateTime<Utc>) -> Vec<ScheduleInstance> {
    let base_id = Uuid::new_v4().to_string();
    let group_id = Uuid::new_v4().to_string();
    expand_with_ids(draft, config, now, &base_id, &group_id)
}

/// Same as [`expand`] with caller-chosen ids.
///
/// Instance `0` gets `base_id`, instance `n` gets `{base_id}_{n}`.
/// `group_id` is only used when the draft repeats.
pub fn expand_with_ids(
    draft: &ScheduleDraft,
    config: &StoreConfig,
    now: DateTime<Utc>,
    base_id: &str,
    group_id: &str,
) -> Vec<ScheduleInstance> {
    let draft = draft.normalized();

    if !draft.repeat.is_recurring() {
        let mut single = materialize(&draft, base_id.to_string(), draft.start_time, now);
        single.alarm_time = draft.alarm_time;
        return vec![single];
    }

    let offset = config.offset();
    let horizon = horizon(&draft, config);
    let alarm_offset = draft.alarm_offset();
    let cap = config.instance_cap();

    let mut instances = Vec::new();
    for index in 0..cap {
        let Ok(n) = u32::try_from(index) else { break };
        let Some(start) = nth_occurrence(draft.start_time, draft.repeat, n, offset) else {
            break;
        };
        if start > horizon {
            break;
        }

        let id = if index == 0 {
            base_id.to_string()
        } else {
            format!("{base_id}_{index}")
        };

        let mut instance = materialize(&draft, id, start, now);
        instance.repeat_group_id = Some(group_id.to_string());
        instance.is_recurring = true;
        instance.original_repeat = Some(draft.repeat);
        instance.original_repeat_end_date = draft.repeat_end_date;
        instance.alarm_time = alarm_offset.map(|lead| start - lead);
        instances.push(instance);
    }

    if instances.len() == cap {
        info!(
            "Recurrence {} for '{}' capped at {cap} instances",
            draft.repeat, draft.title
        );
    }
    debug!(
        "Expanded {} schedule '{}' into {} instances (group {group_id})",
        draft.repeat,
        draft.title,
        instances.len()
    );

    instances
}

/// Latest instant through which occurrences are generated.
///
/// An explicit end date counts through the end of its local calendar day. The
/// horizon never precedes the first occurrence, so a draft whose end date lies
/// before its start still yields its first instance.
pub fn horizon(draft: &ScheduleDraft, config: &StoreConfig) -> DateTime<Utc> {
    let offset = config.offset();
    let horizon = match draft.repeat_end_date {
        Some(end) => end_of_day(local_date(&end, offset), offset),
        None => add_local_months(draft.start_time, config.default_horizon_months, offset)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    };

    if horizon < draft.start_time {
        debug!(
            "Repeat end {horizon} precedes start {}, keeping first occurrence only",
            draft.start_time
        );
        draft.start_time
    } else {
        horizon
    }
}

/// Start of occurrence `n` (0-based) of a schedule first starting at `first`.
pub fn nth_occurrence(first: DateTime<Utc>, repeat: Repeat, n: u32, offset: FixedOffset) -> Option<DateTime<Utc>> {
    match repeat {
        Repeat::None => (n == 0).then_some(first),
        Repeat::Daily => add_local_days(first, u64::from(n), offset),
        Repeat::Weekly => add_local_days(first, u64::from(n) * 7, offset),
        Repeat::Monthly => add_local_months(first, n, offset),
        Repeat::Yearly => n
            .checked_mul(12)
            .and_then(|months| add_local_months(first, months, offset)),
    }
}

fn add_local_days(instant: DateTime<Utc>, days: u64, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let local = instant.with_timezone(&offset).naive_local();
    local.checked_add_days(Days::new(days)).map(|shifted| to_utc(shifted, offset))
}

fn add_local_months(instant: DateTime<Utc>, months: u32, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let local = instant.with_timezone(&offset).naive_local();
    local.checked_add_months(Months::new(months)).map(|shifted| to_utc(shifted, offset))
}

fn to_utc(local: chrono::NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    (local - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

fn materialize(draft: &ScheduleDraft, id: String, start: DateTime<Utc>, now: DateTime<Utc>) -> ScheduleInstance {
    ScheduleInstance {
        id,
        title: draft.title.clone(),
        description: draft.description.clone(),
        start_time: start,
        end_time: start + (draft.end_time - draft.start_time),
        category_id: draft.category_id.clone(),
        priority: draft.priority,
        is_completed: false,
        repeat: draft.repeat,
        repeat_end_date: draft.repeat_end_date,
        repeat_group_id: None,
        is_recurring: false,
        original_repeat: None,
        original_repeat_end_date: None,
        alarm_enabled: draft.alarm_enabled,
        alarm_time: None,
        created_at: now,
        updated_at: None,
    }
}
