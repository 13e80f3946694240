//! Wire protocol of the Omnicomm LLS fuel-level sensor.
//!
//! Pure encoding and decoding, no I/O: the serial transport and the polling
//! engine live in the `omnicomm-lls` crate.

pub mod checksum;
pub mod command;
pub mod frame;
pub mod scale;
pub mod types;

pub use checksum::checksum;
pub use command::{Command, SettingChange, SettingKey};
pub use frame::{decode_frame, encode_command, DecodeError, Response};
pub use scale::{raw_level_to_volume, scale};
pub use types::{DeviceInfo, MessageType, Opcode, Reading};
