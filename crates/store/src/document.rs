//! Plain-JSON documents and their conversion into records.

use myplant_core::error::StoreError;
use myplant_core::record::{DeviceRecord, EventRecord, Reading, UserProfile};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;

use crate::collections;

/// A stored document: its id and its fields as a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    fn decode<T: DeserializeOwned>(self, collection: &str) -> Result<(String, T), StoreError> {
        let record = serde_json::from_value(self.fields).map_err(|e| StoreError::Malformed {
            collection: collection.to_string(),
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        Ok((self.id, record))
    }

    pub fn into_profile(self) -> Result<UserProfile, StoreError> {
        let (id, mut profile): (String, UserProfile) = self.decode(collections::USER_PROFILES)?;
        profile.user_id = id;
        Ok(profile)
    }

    pub fn into_device(self) -> Result<DeviceRecord, StoreError> {
        let (id, mut device): (String, DeviceRecord) = self.decode(collections::DEVICES)?;
        device.device_id = id;
        Ok(device)
    }

    pub fn into_reading(self) -> Result<Reading, StoreError> {
        let (id, mut reading): (String, Reading) = self.decode(collections::READINGS)?;
        reading.id = id;
        Ok(reading)
    }

    pub fn into_event(self) -> Result<EventRecord, StoreError> {
        let (_, event) = self.decode(collections::EVENTS)?;
        Ok(event)
    }
}

/// Rank of a value's type in Firestore's cross-type ordering.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compare two field values the way Firestore orders them: by type first,
/// then by value within a type.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
