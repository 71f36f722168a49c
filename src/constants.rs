// src/constants.rs

/// Storage key holding the JSON array of schedule instances.
pub const SCHEDULES_KEY: &str = "schedules";

/// Storage key holding the JSON array of categories.
pub const CATEGORIES_KEY: &str = "categories";

/// Storage key holding the JSON object of registered alarms, keyed by schedule id.
pub const ALARM_INFO_KEY: &str = "alarmInfo";

/// Hard cap on the number of instances materialized from one recurrence rule.
pub const MAX_RECURRING_INSTANCES: usize = 365;

/// Recurrence horizon in months when no repeat end date is given (one year).
pub const DEFAULT_HORIZON_MONTHS: u32 = 12;

/// Alarm lead times offered to users, in minutes before the schedule starts.
pub const ALARM_OFFSET_PRESETS_MINUTES: &[u32] = &[5, 10, 30, 60, 1440];

/// Longest accepted alarm lead time in minutes (one week).
pub const MAX_ALARM_OFFSET_MINUTES: u32 = 7 * 24 * 60;

/// Maximum schedule title length
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum category name length
pub const MAX_CATEGORY_NAME_LEN: usize = 100;

/// Dot color for calendar days whose schedule references an unknown category.
pub const DEFAULT_MARKER_COLOR: &str = "#A5D8FF";
