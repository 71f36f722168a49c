//! Calendar view windows and the queries that run against them.
//!
//! Everything here is a pure function over a slice of instances: inputs are
//! never mutated and identical inputs always produce identical output.

use crate::constants::DEFAULT_MARKER_COLOR;
use crate::models::{Category, ScheduleInstance};
use crate::timestamp::{end_of_day, local_date, start_of_day};
use chrono::{DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Daily => "daily",
            ViewMode::Weekly => "weekly",
            ViewMode::Monthly => "monthly",
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ViewMode::Daily),
            "weekly" => Ok(ViewMode::Weekly),
            "monthly" => Ok(ViewMode::Monthly),
            other => Err(format!("unknown view mode '{other}'")),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive range of local calendar days shown by one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    /// 00:00:00.000 local on `first_day`.
    pub start: DateTime<Utc>,
    /// 23:59:59.999 local on `last_day`.
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(first_day: NaiveDate, last_day: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            first_day,
            last_day,
            start: start_of_day(first_day, offset),
            end: end_of_day(last_day, offset),
        }
    }

    /// The window `mode` shows for `anchor`: the day itself, its Sunday-to-Saturday
    /// week, or its calendar month.
    pub fn for_view(mode: ViewMode, anchor: NaiveDate, offset: FixedOffset) -> Self {
        let (first_day, last_day) = match mode {
            ViewMode::Daily => (anchor, anchor),
            ViewMode::Weekly => {
                let back = u64::from(anchor.weekday().num_days_from_sunday());
                let sunday = anchor.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
                let saturday = sunday.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
                (sunday, saturday)
            }
            ViewMode::Monthly => {
                let first = anchor
                    .checked_sub_days(Days::new(u64::from(anchor.day0())))
                    .unwrap_or(NaiveDate::MIN);
                let last = first
                    .checked_add_months(Months::new(1))
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(NaiveDate::MAX);
                (first, last)
            }
        };
        Self::new(first_day, last_day, offset)
    }

    pub fn overlaps(&self, instance: &ScheduleInstance) -> bool {
        instance.overlaps(self.start, self.end)
    }

    /// Each local day in the window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first_day
            .iter_days()
            .take_while(move |day| *day <= self.last_day)
    }

    /// Short human label, e.g. `2024-01-07 ~ 2024-01-13`.
    pub fn label(&self) -> String {
        if self.first_day == self.last_day {
            self.first_day.format("%Y-%m-%d").to_string()
        } else {
            format!(
                "{} ~ {}",
                self.first_day.format("%Y-%m-%d"),
                self.last_day.format("%Y-%m-%d")
            )
        }
    }
}

/// Instances overlapping the `mode` window around `anchor`, incomplete ones
/// first, each group ordered by start time.
///
/// A multi-day instance shows up in the daily view of every local day from the
/// one it starts on through the one it ends on. Records that end before they
/// start are logged and left out.
pub fn query(
    all: &[ScheduleInstance],
    mode: ViewMode,
    anchor: NaiveDate,
    offset: FixedOffset,
) -> Vec<ScheduleInstance> {
    let window = DateWindow::for_view(mode, anchor, offset);
    let mut matched: Vec<ScheduleInstance> = all
        .iter()
        .filter(|instance| {
            if instance.is_well_formed() {
                window.overlaps(instance)
            } else {
                warn!(
                    "Skipping schedule {} in {mode} query: ends before it starts",
                    instance.id
                );
                false
            }
        })
        .cloned()
        .collect();

    sort_for_display(&mut matched);
    matched
}

/// Stable sort: incomplete before completed, then by start time.
pub fn sort_for_display(instances: &mut [ScheduleInstance]) {
    instances.sort_by(|a, b| {
        a.is_completed
            .cmp(&b.is_completed)
            .then_with(|| a.start_time.cmp(&b.start_time))
    });
}

/// Instances whose start falls on the local day `date`.
pub fn starting_on(all: &[ScheduleInstance], date: NaiveDate, offset: FixedOffset) -> Vec<ScheduleInstance> {
    all.iter()
        .filter(|instance| local_date(&instance.start_time, offset) == date)
        .cloned()
        .collect()
}

/// Case-insensitive substring search on title or description.
/// An empty term matches everything.
pub fn search(all: &[ScheduleInstance], term: &str) -> Vec<ScheduleInstance> {
    let needle = term.to_lowercase();
    all.iter()
        .filter(|instance| instance.matches_term(&needle))
        .cloned()
        .collect()
}

/// One calendar dot: which schedule starts that day and its category color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMarker {
    pub schedule_id: String,
    pub color: String,
}

/// Calendar dots for every day in `window` on which at least one instance starts.
pub fn marked_days(
    all: &[ScheduleInstance],
    categories: &[Category],
    window: &DateWindow,
    offset: FixedOffset,
) -> BTreeMap<NaiveDate, Vec<DayMarker>> {
    let mut marks: BTreeMap<NaiveDate, Vec<DayMarker>> = BTreeMap::new();

    for instance in all {
        let day = local_date(&instance.start_time, offset);
        if day < window.first_day || day > window.last_day {
            continue;
        }
        let color = Category::find(categories, &instance.category_id)
            .map_or(DEFAULT_MARKER_COLOR, |c| c.color.as_str());
        marks.entry(day).or_default().push(DayMarker {
            schedule_id: instance.id.clone(),
            color: color.to_string(),
        });
    }

    marks
}
