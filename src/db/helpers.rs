// src/db/helpers.rs

use super::KeyValueStore;
use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Read and decode the JSON document under `key`, `None` if the key is unset.
pub fn load_json<T, S>(store: &S, key: &str) -> Result<Option<T>, AppError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key).map_err(|e| {
        log::error!("Failed to read '{key}': {e}");
        e
    })?
    else {
        return Ok(None);
    };

    serde_json::from_str(&raw).map(Some).map_err(|e| {
        log::error!("Failed to decode '{key}': {e}");
        AppError::from(e)
    })
}

/// A JSON array decoded element by element.
///
/// `unreadable` holds the raw elements that failed to decode, in their stored
/// order, so a later write can put them back instead of dropping them.
#[derive(Debug, Clone, PartialEq)]
pub struct Records<T> {
    pub records: Vec<T>,
    pub unreadable: Vec<Value>,
}

impl<T> Default for Records<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            unreadable: Vec::new(),
        }
    }
}

/// Read the JSON array under `key`, decoding each element on its own.
///
/// Elements that fail to decode (unparsable timestamps, missing fields) are
/// logged and set aside so one bad record cannot hide the rest. A missing key
/// is `None`; a value that is not an array at all is an error.
pub fn load_records<T, S>(store: &S, key: &str) -> Result<Option<Records<T>>, AppError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(values) = load_json::<Vec<Value>, S>(store, key)? else {
        return Ok(None);
    };

    let total = values.len();
    let mut loaded = Records::default();
    for (index, value) in values.into_iter().enumerate() {
        match T::deserialize(&value) {
            Ok(record) => loaded.records.push(record),
            Err(e) => {
                log::warn!("Skipping malformed record {index} in '{key}': {e}");
                loaded.unreadable.push(value);
            }
        }
    }

    if !loaded.unreadable.is_empty() {
        log::warn!(
            "Loaded {} of {total} records from '{key}', keeping the rest as stored",
            loaded.records.len()
        );
    }
    Ok(Some(loaded))
}

/// Write `records` under `key`, followed by the raw `unreadable` elements.
pub fn save_records<T, S>(store: &mut S, key: &str, records: &[T], unreadable: &[Value]) -> Result<(), AppError>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    if unreadable.is_empty() {
        return save_json(store, key, records);
    }

    let mut values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()?;
    values.extend(unreadable.iter().cloned());
    save_json(store, key, &values)
}

/// Encode `value` as JSON and write it under `key` in one call.
pub fn save_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), AppError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string(value)?;
    store.set(key, &json).map_err(|e| {
        log::error!("Failed to write '{key}': {e}");
        e
    })
}
