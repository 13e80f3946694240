use derive_more::Display;
use serde::{Deserialize, Serialize};

use lls_protocol::{DeviceInfo, Reading};

/// Ids of the values published to the state store.
pub mod keys {
    pub const CONNECTION: &str = "info.connection";

    pub const LEVEL: &str = "level";
    pub const TEMPERATURE: &str = "temperature";
    pub const RELATIVE_LEVEL: &str = "relative_level";
    pub const FREQUENCY_VALUE: &str = "frequency_value";

    pub const MODEL: &str = "model";
    pub const VERSION: &str = "version";
    pub const MODE: &str = "mode";
    pub const INTERVAL: &str = "interval";
    pub const FILTER: &str = "filter";
    pub const CALIBRATION_MIN: &str = "min";
    pub const CALIBRATION_MAX: &str = "max";
    pub const COUNTER1: &str = "CNT1";
    pub const COUNTER2: &str = "CNT2";
}

/// A value held by the state store.
#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl StateValue {
    /// Parse free-form text the way a user would type a value.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(b) = raw.parse::<bool>() {
            StateValue::Bool(b)
        } else if let Ok(i) = raw.parse::<i64>() {
            StateValue::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            StateValue::Float(f)
        } else {
            StateValue::Text(raw.to_string())
        }
    }

    /// Integer view of the value; floats are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StateValue::Bool(b) => Some(*b as i64),
            StateValue::Int(i) => Some(*i),
            StateValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            StateValue::Float(_) => None,
            StateValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
            }
        }
    }
}

impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        StateValue::Bool(v)
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        StateValue::Int(v)
    }
}

impl From<f64> for StateValue {
    fn from(v: f64) -> Self {
        StateValue::Float(v)
    }
}

impl From<String> for StateValue {
    fn from(v: String) -> Self {
        StateValue::Text(v)
    }
}

impl From<&str> for StateValue {
    fn from(v: &str) -> Self {
        StateValue::Text(v.to_string())
    }
}

/// One write to the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub key: String,
    pub value: StateValue,
    pub ack: bool,
    pub timestamp: String,
}

impl StateUpdate {
    pub fn new(key: &str, value: StateValue, ack: bool) -> Self {
        Self {
            key: key.to_string(),
            value,
            ack,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// State entries published for a live reading, in publish order.
pub fn reading_entries(reading: &Reading) -> Vec<(&'static str, StateValue)> {
    vec![
        (keys::LEVEL, reading.fuel_volume.into()),
        (keys::TEMPERATURE, (reading.temperature as i64).into()),
        (keys::RELATIVE_LEVEL, (reading.raw_level as i64).into()),
        (keys::FREQUENCY_VALUE, (reading.frequency_value as i64).into()),
    ]
}

/// State entries published for a device information block, in publish order.
pub fn device_info_entries(info: &DeviceInfo) -> Vec<(&'static str, StateValue)> {
    vec![
        (keys::MODEL, info.model.as_str().into()),
        (keys::VERSION, info.firmware_version.as_str().into()),
        (keys::MODE, (info.mode as i64).into()),
        (keys::INTERVAL, (info.interval as i64).into()),
        (keys::FILTER, (info.filter_depth as i64).into()),
        (keys::CALIBRATION_MIN, (info.calibration_min as i64).into()),
        (keys::CALIBRATION_MAX, (info.calibration_max as i64).into()),
        (keys::COUNTER1, (info.counter1 as i64).into()),
        (keys::COUNTER2, (info.counter2 as i64).into()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_text() {
        assert_eq!(StateValue::parse("true"), StateValue::Bool(true));
        assert_eq!(StateValue::parse(" 12 "), StateValue::Int(12));
        assert_eq!(StateValue::parse("1.5"), StateValue::Float(1.5));
        assert_eq!(StateValue::parse("abc"), StateValue::Text("abc".into()));
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(StateValue::Bool(true).as_i64(), Some(1));
        assert_eq!(StateValue::Float(2.9).as_i64(), Some(2));
        assert_eq!(StateValue::Float(-0.5).as_i64(), Some(0));
        assert_eq!(StateValue::Text("7".into()).as_i64(), Some(7));
        assert_eq!(StateValue::Text("3.7".into()).as_i64(), Some(3));
        assert_eq!(StateValue::Text("x".into()).as_i64(), None);
        assert_eq!(StateValue::Float(f64::NAN).as_i64(), None);
    }

    #[test]
    fn test_untagged_json() {
        let update = StateUpdate::new(keys::LEVEL, StateValue::Float(4.4), true);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["key"], "level");
        assert_eq!(json["value"], 4.4);
        assert_eq!(json["ack"], true);
    }
}
