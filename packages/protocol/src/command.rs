use bytes::Bytes;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use strum::{AsRefStr, EnumIter, EnumString};

use crate::{frame::encode_command, types::Opcode};

pub const MODE_RANGE: RangeInclusive<i64> = 0..=2;
pub const INTERVAL_RANGE: RangeInclusive<i64> = 0..=255;
pub const FILTER_DEPTH_RANGE: RangeInclusive<i64> = 0..=20;

/// Every frame the host sends to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Command {
    #[display("read device info")]
    ReadDeviceInfo,
    #[display("read reading")]
    ReadReading,
    #[display("request periodic data")]
    RequestPeriodicData,
    #[display("set mode {_0}")]
    SetMode(u8),
    #[display("set interval {_0}")]
    SetInterval(u8),
    #[display("set filter depth {_0}")]
    SetFilterDepth(u8),
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::ReadDeviceInfo => Opcode::ReadDeviceInfo,
            Command::ReadReading => Opcode::ReadReading,
            Command::RequestPeriodicData => Opcode::RequestPeriodicData,
            Command::SetMode(_) => Opcode::SetMode,
            Command::SetInterval(_) => Opcode::SetInterval,
            Command::SetFilterDepth(_) => Opcode::SetFilterDepth,
        }
    }

    pub fn parameter(&self) -> Option<u8> {
        match *self {
            Command::SetMode(v) | Command::SetInterval(v) | Command::SetFilterDepth(v) => Some(v),
            _ => None,
        }
    }

    /// Encode this command for the sensor at `address`.
    pub fn encode(&self, address: u8) -> Bytes {
        encode_command(address, self.opcode() as u8, self.parameter())
    }
}

/// Names of the user-writable settings, as used by the state store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter, Serialize, Deserialize,
)]
pub enum SettingKey {
    #[strum(serialize = "onPeriodData")]
    #[serde(rename = "onPeriodData")]
    PeriodicData,
    #[strum(serialize = "mode")]
    #[serde(rename = "mode")]
    Mode,
    #[strum(serialize = "interval")]
    #[serde(rename = "interval")]
    Interval,
    #[strum(serialize = "filter")]
    #[serde(rename = "filter")]
    FilterDepth,
}

impl SettingKey {
    pub fn takes_value(self) -> bool {
        !matches!(self, SettingKey::PeriodicData)
    }
}

/// A configuration write requested by the user, before range clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    RequestPeriodicData,
    Mode(i64),
    Interval(i64),
    FilterDepth(i64),
}

impl SettingChange {
    /// Pair a setting with its requested value.
    ///
    /// Returns `None` when a setting that needs a value has none.
    pub fn new(key: SettingKey, value: Option<i64>) -> Option<Self> {
        match key {
            SettingKey::PeriodicData => Some(SettingChange::RequestPeriodicData),
            SettingKey::Mode => value.map(SettingChange::Mode),
            SettingKey::Interval => value.map(SettingChange::Interval),
            SettingKey::FilterDepth => value.map(SettingChange::FilterDepth),
        }
    }

    /// Clamp the requested value into its valid range and build the write command.
    pub fn into_command(self) -> Command {
        match self {
            SettingChange::RequestPeriodicData => Command::RequestPeriodicData,
            SettingChange::Mode(v) => Command::SetMode(clamp_to(v, &MODE_RANGE)),
            SettingChange::Interval(v) => Command::SetInterval(clamp_to(v, &INTERVAL_RANGE)),
            SettingChange::FilterDepth(v) => {
                Command::SetFilterDepth(clamp_to(v, &FILTER_DEPTH_RANGE))
            }
        }
    }
}

fn clamp_to(value: i64, range: &RangeInclusive<i64>) -> u8 {
    // Every range above lies within 0..=255
    value.clamp(*range.start(), *range.end()) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_opcodes() {
        assert_eq!(Command::ReadDeviceInfo.opcode() as u8, 0x10);
        assert_eq!(Command::ReadReading.opcode() as u8, 0x06);
        assert_eq!(Command::RequestPeriodicData.opcode() as u8, 0x07);
        assert_eq!(Command::SetMode(0).opcode() as u8, 0x17);
        assert_eq!(Command::SetInterval(0).opcode() as u8, 0x13);
        assert_eq!(Command::SetFilterDepth(0).opcode() as u8, 0x0E);
    }

    #[test]
    fn test_mode_is_clamped() {
        let command = SettingChange::Mode(5).into_command();
        assert_eq!(command, Command::SetMode(2));
        assert_eq!(&command.encode(0x03)[..], &[0x31, 0x03, 0x17, 0x02, 0x1D]);
    }

    #[test]
    fn test_interval_is_clamped() {
        let command = SettingChange::Interval(-1).into_command();
        assert_eq!(command, Command::SetInterval(0));
        assert_eq!(&command.encode(0x03)[..], &[0x31, 0x03, 0x13, 0x00, 0x9A]);
        assert_eq!(
            SettingChange::Interval(1000).into_command(),
            Command::SetInterval(255)
        );
    }

    #[test]
    fn test_filter_depth_is_clamped() {
        assert_eq!(
            SettingChange::FilterDepth(42).into_command(),
            Command::SetFilterDepth(20)
        );
        assert_eq!(
            SettingChange::FilterDepth(7).into_command(),
            Command::SetFilterDepth(7)
        );
    }

    #[test]
    fn test_periodic_data_has_no_parameter() {
        let frame = SettingChange::RequestPeriodicData.into_command().encode(0x03);
        assert_eq!(&frame[..], &[0x31, 0x03, 0x07, 0xA3]);
    }

    #[test]
    fn test_setting_keys_round_trip_through_names() {
        for key in SettingKey::iter() {
            assert_eq!(SettingKey::from_str(key.as_ref()).unwrap(), key);
        }
        assert!(SettingKey::from_str("level").is_err());
    }

    #[test]
    fn test_value_required() {
        assert_eq!(SettingChange::new(SettingKey::Mode, None), None);
        assert_eq!(
            SettingChange::new(SettingKey::PeriodicData, None),
            Some(SettingChange::RequestPeriodicData)
        );
    }
}
