use serde::{Deserialize, Serialize};
use strum::FromRepr;

/// First byte of every frame sent from the host to the sensor.
pub const COMMAND_PREFIX: u8 = 0x31;

/// Operation codes understood by the sensor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    /// Read a single live reading.
    ReadReading = 0x06,
    /// Start periodic output of readings.
    RequestPeriodicData = 0x07,
    /// Set the depth of the level filter.
    SetFilterDepth = 0x0E,
    /// Read the device information block.
    ReadDeviceInfo = 0x10,
    /// Set the interval of periodic output.
    SetInterval = 0x13,
    /// Set the default output mode.
    SetMode = 0x17,
}

/// Discriminator at offset 2 of a response frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
pub enum MessageType {
    Reading = 0x06,
    DeviceInfo = 0x10,
}

/// Live reading decoded from a reading response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Temperature in degrees, sign-magnitude encoded on the wire.
    pub temperature: i8,
    /// Raw level count as reported by the sensor.
    pub raw_level: u16,
    /// `raw_level` mapped onto volume units, rounded to two decimals.
    pub fuel_volume: f64,
    pub frequency_value: u16,
}

/// Identification and settings block decoded from a device-info response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: String,
    pub firmware_version: String,
    pub mode: i8,
    pub interval: i8,
    pub filter_depth: i8,
    pub calibration_min: i16,
    pub calibration_max: i16,
    pub counter1: u32,
    pub counter2: u32,
}
