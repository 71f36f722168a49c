pub mod helpers;
pub mod memory;
pub mod migrations;
pub mod schema;

pub use helpers::{load_json, load_records, save_json, save_records, Records};
pub use memory::MemoryStore;

use crate::error::AppError;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// String-keyed blob storage. Values are opaque JSON documents.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError>;

    /// Returns whether the key existed.
    fn remove(&mut self, key: &str) -> Result<bool, AppError>;
}

/// On-device SQLite database holding a single key-value table.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or(0)
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, current_timestamp()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, AppError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CATEGORIES_KEY;
    use crate::models::Category;
    use crate::test_utils::setup_test_db;
    use tempfile::tempdir;

    #[test]
    fn test_database_opens() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let _db = Database::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_migrations_run() {
        let (db, _dir) = setup_test_db();

        let count: i32 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='kv_store'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_default_categories_seeded() {
        let (db, _dir) = setup_test_db();

        let raw = db.get(CATEGORIES_KEY).unwrap().expect("categories should be seeded");
        let categories: Vec<Category> = serde_json::from_str(&raw).unwrap();
        assert_eq!(categories, Category::defaults());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let (mut db, _dir) = setup_test_db();
        db.set(CATEGORIES_KEY, "[]").unwrap();

        // A second run must not overwrite user data
        migrations::run(db.connection()).unwrap();

        assert_eq!(db.get(CATEGORIES_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_set_overwrites_and_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        {
            let mut db = Database::open(&db_path).unwrap();
            migrations::run(db.connection()).unwrap();
            db.set("schedules", "[1]").unwrap();
            db.set("schedules", "[1,2]").unwrap();
        }

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.get("schedules").unwrap().as_deref(), Some("[1,2]"));
        assert!(db.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_remove() {
        let (mut db, _dir) = setup_test_db();
        db.set("alarmInfo", "{}").unwrap();

        assert!(db.remove("alarmInfo").unwrap());
        assert!(!db.remove("alarmInfo").unwrap());
    }

    #[test]
    fn test_in_memory_database() {
        let mut db = Database::open_in_memory().unwrap();
        migrations::run(db.connection()).unwrap();
        db.set("k", "v").unwrap();
        assert_eq!(db.get("k").unwrap().as_deref(), Some("v"));
    }
}
