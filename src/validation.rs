use crate::constants::*;
use crate::dtos::ScheduleDraft;
use crate::error::{AppError, FieldError};
use crate::models::{Category, ScheduleInstance};
use chrono::{DateTime, TimeDelta, Utc};

/// Validate a schedule title. Returns the trimmed title.
pub fn validate_title(title: &str) -> Result<&str, FieldError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(FieldError::new("title", "cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(FieldError::new(
            "title",
            format!("cannot exceed {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(title)
}

/// End must come strictly after start.
pub fn validate_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), FieldError> {
    if end <= start {
        return Err(FieldError::new("endTime", "must be after the start time"));
    }
    Ok(())
}

/// An enabled alarm needs a time, and that time must precede the start by at
/// most a week.
pub fn validate_alarm(
    alarm_enabled: bool,
    alarm_time: Option<DateTime<Utc>>,
    start: DateTime<Utc>,
) -> Result<(), FieldError> {
    if !alarm_enabled {
        return Ok(());
    }
    match alarm_time {
        None => Err(FieldError::new("alarmTime", "required when the alarm is enabled")),
        Some(alarm) if alarm >= start => {
            Err(FieldError::new("alarmTime", "must be before the start time"))
        }
        Some(alarm) if start - alarm > TimeDelta::minutes(i64::from(MAX_ALARM_OFFSET_MINUTES)) => {
            Err(FieldError::new(
                "alarmTime",
                format!("cannot be more than {MAX_ALARM_OFFSET_MINUTES} minutes before the start time"),
            ))
        }
        Some(_) => Ok(()),
    }
}

pub fn validate_category_ref(category_id: &str, categories: &[Category]) -> Result<(), FieldError> {
    if category_id.trim().is_empty() {
        return Err(FieldError::new("categoryId", "a category must be selected"));
    }
    if Category::find(categories, category_id).is_none() {
        return Err(FieldError::new(
            "categoryId",
            format!("unknown category '{category_id}'"),
        ));
    }
    Ok(())
}

/// Check every field of a draft, collecting all failures.
pub fn validate_draft(draft: &ScheduleDraft, categories: &[Category]) -> Result<(), AppError> {
    let errors: Vec<FieldError> = [
        validate_title(&draft.title).map(|_| ()),
        validate_time_range(draft.start_time, draft.end_time),
        validate_category_ref(&draft.category_id, categories),
        validate_alarm(draft.alarm_enabled, draft.alarm_time, draft.start_time),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Check an instance after an edit, collecting all failures.
pub fn validate_instance(instance: &ScheduleInstance, categories: &[Category]) -> Result<(), AppError> {
    let errors: Vec<FieldError> = [
        validate_title(&instance.title).map(|_| ()),
        validate_time_range(instance.start_time, instance.end_time),
        validate_category_ref(&instance.category_id, categories),
        validate_alarm(instance.alarm_enabled, instance.alarm_time, instance.start_time),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Validate category name.
pub fn validate_category_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput {
            field: "name",
            reason: "cannot be empty".into(),
        });
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(AppError::InvalidInput {
            field: "name",
            reason: format!("cannot exceed {MAX_CATEGORY_NAME_LEN} characters"),
        });
    }
    Ok(name)
}

/// Validate a hex color (`#RGB` or `#RRGGBB`).
pub fn validate_color(color: &str) -> Result<&str, AppError> {
    let color = color.trim();
    let err = || AppError::InvalidInput {
        field: "color",
        reason: format!("'{color}' is not a #RGB or #RRGGBB hex color"),
    };

    let digits = color.strip_prefix('#').ok_or_else(err)?;
    if !matches!(digits.len(), 3 | 6) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(err());
    }
    Ok(color)
}
