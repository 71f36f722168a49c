pub mod alarm;
pub mod config;
pub mod constants;
pub mod db;
pub mod dtos;
pub mod error;
pub mod models;
pub mod query;
pub mod recurrence;
pub mod store;
pub mod timestamp;
pub mod validation;

mod test_utils;

pub use alarm::{AlarmInfo, AlarmService, Notifier, NotifyError};
pub use config::StoreConfig;
pub use db::{Database, KeyValueStore, MemoryStore};
pub use dtos::{SchedulePatch, ScheduleDraft};
pub use error::{AppError, FieldError};
pub use models::{Category, Priority, Repeat, ScheduleInstance};
pub use query::{DateWindow, DayMarker, ViewMode};
pub use store::ScheduleStore;

use crate::db::migrations;
use log::{error, info};
use std::path::Path;

/// Errors that can occur while bringing the store up on a device.
#[derive(Debug)]
pub enum InitError {
    NoDataDir(std::io::Error),
    DatabaseOpen(rusqlite::Error),
    Migration(rusqlite::Error),
    Load(AppError),
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::NoDataDir(e) => write!(f, "Could not prepare data directory: {e}"),
            InitError::DatabaseOpen(e) => write!(f, "Failed to open database: {e}"),
            InitError::Migration(e) => write!(f, "Failed to run database migrations: {e}"),
            InitError::Load(e) => write!(f, "Failed to load stored schedules: {e}"),
        }
    }
}

impl std::error::Error for InitError {}

/// Open the store backed by the SQLite database at `path`, creating and
/// migrating it if needed.
pub fn open_at(
    path: &Path,
    notifier: Option<Box<dyn Notifier>>,
    config: StoreConfig,
) -> Result<ScheduleStore<Database>, InitError> {
    let db = Database::open(path).map_err(|e| {
        error!("Failed to open database at {}: {e}", path.display());
        InitError::DatabaseOpen(e)
    })?;

    if let Err(e) = migrations::run(db.connection()) {
        error!("Failed to run migrations: {e}");
        return Err(InitError::Migration(e));
    }

    let store = ScheduleStore::open(db, notifier, config).map_err(|e| {
        error!("Failed to load schedule store: {e}");
        InitError::Load(e)
    })?;

    info!("Schedule store ready at {}", path.display());
    Ok(store)
}

/// Open the store in the platform data directory, using the device's current
/// UTC offset for calendar arithmetic.
pub fn open_default(notifier: Option<Box<dyn Notifier>>) -> Result<ScheduleStore<Database>, InitError> {
    let path = config::default_database_path().map_err(|e| {
        error!("Scheduler initialization failed: {e}");
        InitError::NoDataDir(e)
    })?;
    open_at(&path, notifier, StoreConfig::with_local_offset())
}
