//! Records read from the document store.
//!
//! Documents are written by devices and the mobile app, not by this
//! backend, so decoding is lenient: a field with an unexpected type is
//! treated as missing instead of failing the whole document.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A timestamp exactly as stored: either text or epoch milliseconds.
///
/// Briefings render it verbatim; [`crate::timestamp`] decides validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(f64),
    Text(String),
}

impl RawTimestamp {
    /// Interpret a JSON value; anything but a string or number is `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RawTimestamp::Text(s.clone())),
            Value::Number(n) => n.as_f64().map(RawTimestamp::Millis),
            _ => None,
        }
    }
}

impl std::fmt::Display for RawTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawTimestamp::Millis(ms) => write!(f, "{ms}"),
            RawTimestamp::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RawTimestamp {
    fn from(s: &str) -> Self {
        RawTimestamp::Text(s.to_string())
    }
}

/// `userProfiles/{userId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Document id; filled in by the store.
    #[serde(default)]
    pub user_id: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

/// `devices/{deviceId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Document id; filled in by the store.
    #[serde(default)]
    pub device_id: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_seen: Option<RawTimestamp>,
}

/// `readings/{id}`: one sensor sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Document id; filled in by the store.
    #[serde(default)]
    pub id: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub device_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<RawTimestamp>,

    /// Celsius
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Relative humidity, percent
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    /// Raw soil moisture ADC value; higher is drier
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub moisture: Option<f64>,

    /// 1 = raining
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub rain: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub sound: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub light_analog: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub light_digital: Option<f64>,

    /// Legacy firmware name for `temperature`.
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,

    /// Legacy firmware name for `moisture`.
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,
}

/// `events/{eventId}`: an alert raised by a device or rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<RawTimestamp>,

    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl EventRecord {
    /// `value` as push-payload text; `""` when absent.
    pub fn value_text(&self) -> String {
        match &self.value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// `timestamp` as push-payload text; `""` when absent.
    pub fn timestamp_text(&self) -> String {
        self.timestamp
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_default()
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RawTimestamp>, D::Error> {
    Ok(RawTimestamp::from_value(&Value::deserialize(d)?))
}
