//! Store configuration.
//!
//! Every field has a default, so an empty JSON object (or no config at all) is
//! valid. The UTC offset decides where calendar days begin and end, both for
//! recurrence arithmetic and for daily/weekly/monthly windows.

use crate::constants::{DEFAULT_HORIZON_MONTHS, MAX_RECURRING_INSTANCES};
use crate::error::AppError;
use chrono::{FixedOffset, Local, Offset, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the on-device key-value database.
pub const DATABASE_FILE_NAME: &str = "scheduler.db";

/// Largest UTC offset chrono accepts, exclusive (24 hours).
const MAX_OFFSET_SECS: i32 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Offset of the user's local time from UTC, in seconds east of Greenwich.
    pub utc_offset_secs: i32,
    /// Upper bound on instances per recurrence group.
    pub max_instances: usize,
    /// Horizon used when a recurring draft has no end date.
    pub default_horizon_months: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            utc_offset_secs: 0,
            max_instances: MAX_RECURRING_INSTANCES,
            default_horizon_months: DEFAULT_HORIZON_MONTHS,
        }
    }
}

impl StoreConfig {
    /// Defaults, with the offset taken from the device's current local time.
    pub fn with_local_offset() -> Self {
        Self {
            utc_offset_secs: Local::now().offset().fix().local_minus_utc(),
            ..Self::default()
        }
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset_secs = offset.local_minus_utc();
        self
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(content: &str) -> Result<Self, AppError> {
        let config: StoreConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(-MAX_OFFSET_SECS + 1..MAX_OFFSET_SECS).contains(&self.utc_offset_secs) {
            return Err(AppError::Config(format!(
                "utcOffsetSecs must be within ±{MAX_OFFSET_SECS}, got {}",
                self.utc_offset_secs
            )));
        }
        if self.max_instances == 0 || self.max_instances > MAX_RECURRING_INSTANCES {
            return Err(AppError::Config(format!(
                "maxInstances must be 1-{MAX_RECURRING_INSTANCES}, got {}",
                self.max_instances
            )));
        }
        if self.default_horizon_months == 0 {
            return Err(AppError::Config("defaultHorizonMonths must be positive".into()));
        }
        Ok(())
    }

    /// The configured offset; falls back to UTC if the value is out of range.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| {
            log::warn!(
                "UTC offset {}s is out of range, using UTC",
                self.utc_offset_secs
            );
            Utc.fix()
        })
    }

    /// Instance cap actually applied, never above the hard limit.
    pub fn instance_cap(&self) -> usize {
        self.max_instances.min(MAX_RECURRING_INSTANCES)
    }
}

/// Default on-device location of the key-value database.
pub fn default_database_path() -> Result<PathBuf, std::io::Error> {
    let proj_dirs = ProjectDirs::from("com", "scheduler", "Scheduler").ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not determine project directories",
        )
    })?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.join(DATABASE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.instance_cap(), MAX_RECURRING_INSTANCES);
        assert_eq!(config.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = StoreConfig::from_json(r#"{ "utcOffsetSecs": 32400 }"#).unwrap();
        assert_eq!(config.utc_offset_secs, 32400);
        assert_eq!(config.max_instances, MAX_RECURRING_INSTANCES);
        assert_eq!(config.default_horizon_months, DEFAULT_HORIZON_MONTHS);
    }

    #[test]
    fn test_from_json_rejects_out_of_range_values() {
        assert!(StoreConfig::from_json(r#"{ "maxInstances": 0 }"#).is_err());
        assert!(StoreConfig::from_json(r#"{ "maxInstances": 366 }"#).is_err());
        assert!(StoreConfig::from_json(r#"{ "utcOffsetSecs": 86400 }"#).is_err());
        assert!(StoreConfig::from_json(r#"{ "utcOffsetSecs": -86400 }"#).is_err());
        assert!(matches!(
            StoreConfig::from_json(r#"{ "utcOffsetSecs": -2147483648 }"#),
            Err(AppError::Config(_))
        ));
        assert!(StoreConfig::from_json(r#"{ "utcOffsetSecs": -86399 }"#).is_ok());
        assert!(StoreConfig::from_json(r#"{ "defaultHorizonMonths": 0 }"#).is_err());
    }

    #[test]
    fn test_with_offset() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        let config = StoreConfig::default().with_offset(kst);
        assert_eq!(config.offset(), kst);
    }
}
