use bytes::Bytes;
use derive_more::{Display, Error};

use crate::{
    checksum::checksum,
    scale::raw_level_to_volume,
    types::{DeviceInfo, MessageType, Reading, COMMAND_PREFIX},
};

/// Smallest frame that can carry prefix, address, message type and checksum.
pub const MIN_FRAME_LEN: usize = 4;
/// Reading response: 8 bytes of body plus checksum.
pub const READING_FRAME_LEN: usize = 9;
/// Device-info response: 43 bytes of body plus checksum.
pub const DEVICE_INFO_FRAME_LEN: usize = 44;

/// A checksum-valid response frame, split by its message type.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Reading(Reading),
    DeviceInfo(DeviceInfo),
    /// Valid frame whose message type this decoder does not know.
    Unrecognized { message_type: u8 },
}

/// Reasons for dropping a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum DecodeError {
    #[display("frame too short: {len} bytes")]
    TooShort { len: usize },
    #[display("checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}")]
    ChecksumMismatch { computed: u8, received: u8 },
    #[display("{kind:?} frame truncated: {len} of {required} bytes")]
    Truncated {
        kind: MessageType,
        len: usize,
        required: usize,
    },
}

/// Build an outbound command frame `[0x31, address, opcode, parameter?, checksum]`.
///
/// Parameter ranges are not checked here.
pub fn encode_command(address: u8, opcode: u8, parameter: Option<u8>) -> Bytes {
    let mut frame = Vec::with_capacity(5);
    frame.push(COMMAND_PREFIX);
    frame.push(address);
    frame.push(opcode);
    if let Some(p) = parameter {
        frame.push(p);
    }
    frame.push(checksum(&frame));
    Bytes::from(frame)
}

/// Validate a received frame and decode it according to its message type.
pub fn decode_frame(frame: &[u8]) -> Result<Response, DecodeError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(DecodeError::TooShort { len: frame.len() });
    }

    let (&received, body) = frame
        .split_last()
        .ok_or(DecodeError::TooShort { len: 0 })?;
    let computed = checksum(body);
    if computed != received {
        return Err(DecodeError::ChecksumMismatch { computed, received });
    }

    match MessageType::from_repr(frame[2]) {
        Some(kind @ MessageType::Reading) => {
            require_len(frame, kind, READING_FRAME_LEN)?;
            Ok(Response::Reading(decode_reading(frame)))
        }
        Some(kind @ MessageType::DeviceInfo) => {
            require_len(frame, kind, DEVICE_INFO_FRAME_LEN)?;
            Ok(Response::DeviceInfo(decode_device_info(frame)))
        }
        None => Ok(Response::Unrecognized {
            message_type: frame[2],
        }),
    }
}

fn require_len(frame: &[u8], kind: MessageType, required: usize) -> Result<(), DecodeError> {
    if frame.len() < required {
        return Err(DecodeError::Truncated {
            kind,
            len: frame.len(),
            required,
        });
    }
    Ok(())
}

// Callers guarantee the frame length for both decoders below.

fn decode_reading(frame: &[u8]) -> Reading {
    let raw_level = u16::from_le_bytes([frame[4], frame[5]]);
    Reading {
        temperature: decode_sign_magnitude(frame[3]),
        raw_level,
        fuel_volume: raw_level_to_volume(raw_level),
        frequency_value: u16::from_le_bytes([frame[6], frame[7]]),
    }
}

fn decode_device_info(frame: &[u8]) -> DeviceInfo {
    DeviceInfo {
        model: decode_text(&frame[3..19]),
        firmware_version: decode_text(&frame[19..30]),
        mode: frame[30] as i8,
        interval: frame[31] as i8,
        filter_depth: frame[32] as i8,
        calibration_min: i16::from_le_bytes([frame[33], frame[34]]),
        calibration_max: i16::from_le_bytes([frame[35], frame[36]]),
        counter1: u24_le(&frame[37..40]),
        counter2: u24_le(&frame[40..43]),
    }
}

/// Bit 7 is the sign, bits 0-6 the magnitude.
fn decode_sign_magnitude(byte: u8) -> i8 {
    let magnitude = (byte & 0x7F) as i8;
    if byte & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn u24_le(raw: &[u8]) -> u32 {
    u32::from_le_bytes([raw[0], raw[1], raw[2], 0x00])
}

fn decode_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}
