use super::schema::SCHEMA;
use crate::constants::CATEGORIES_KEY;
use crate::models::Category;
use rusqlite::{params, Connection, Result};

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    seed_default_categories(conn)?;
    Ok(())
}

fn seed_default_categories(conn: &Connection) -> Result<()> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM kv_store WHERE key = ?1",
        params![CATEGORIES_KEY],
        |row| row.get(0),
    )?;

    if count == 0 {
        let json = serde_json::to_string(&Category::defaults())
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))",
            params![CATEGORIES_KEY, json],
        )?;
    }
    Ok(())
}
