use bytes::Bytes;
use std::str::FromStr;

use lls_protocol::{decode_frame, Response, SettingChange, SettingKey};

use super::session::Session;
use crate::{
    api::traits::StateSink,
    state::{device_info_entries, reading_entries, StateValue},
};

/// Polling state machine of one connection.
///
/// Decides what to send on each tick, turns user setting changes into write
/// commands and publishes decoded responses to the state sink. It performs no
/// I/O itself: every method returns the frame to send, if any.
pub struct Poller<S> {
    session: Session,
    sink: S,
    connected: Option<bool>,
}

impl<S: StateSink> Poller<S> {
    pub fn new(address: u8, sink: S) -> Self {
        Self {
            session: Session::new(address),
            sink,
            connected: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Frame to send on a timer tick.
    pub fn on_tick(&mut self) -> Bytes {
        let command = self.session.next_poll();
        log::debug!("poll: {command}");
        command.encode(self.session.address())
    }

    /// Frame that writes a user setting, clamped into its valid range.
    pub fn on_setting_change(&mut self, change: SettingChange) -> Bytes {
        let command = change.into_command();
        log::info!("user change {change:?} -> {command}");
        command.encode(self.session.address())
    }

    /// Handle a change notification from the state store.
    ///
    /// Acknowledged values and ids that are not writable settings are ignored.
    pub fn on_user_change(&mut self, id: &str, value: &StateValue, ack: bool) -> Option<Bytes> {
        if ack {
            return None;
        }
        log::info!("state {id} changed: {value} (ack = {ack})");
        let change = parse_setting_change(id, value)?;
        Some(self.on_setting_change(change))
    }

    /// Decode a received frame and publish its values.
    ///
    /// Rejected frames are logged and dropped; the next poll retries.
    pub fn on_frame(&mut self, frame: &[u8]) -> Option<Response> {
        log::debug!("received = {}", to_hex(frame));
        let response = match decode_frame(frame) {
            Ok(response) => response,
            Err(err) => {
                log::debug!("dropping frame: {err}");
                return None;
            }
        };

        match &response {
            Response::Reading(reading) => {
                log::debug!(
                    "reading: raw level {} -> {} units, temperature {}",
                    reading.raw_level,
                    reading.fuel_volume,
                    reading.temperature
                );
                self.publish(reading_entries(reading));
            }
            Response::DeviceInfo(info) => {
                log::info!("device: {} firmware {}", info.model, info.firmware_version);
                self.session.store_device_info(info.clone());
                self.publish(device_info_entries(info));
            }
            Response::Unrecognized { message_type } => {
                log::debug!("ignoring message type 0x{message_type:02X}");
            }
        }
        Some(response)
    }

    /// Publish the connection flag. Repeating the current value publishes nothing.
    pub fn set_connected(&mut self, connected: bool) {
        if self.connected == Some(connected) {
            return;
        }
        self.connected = Some(connected);
        self.publish(vec![(crate::state::keys::CONNECTION, connected.into())]);
    }

    fn publish(&self, entries: Vec<(&'static str, StateValue)>) {
        for (key, value) in entries {
            if let Err(err) = self.sink.set_value(key, value, true) {
                log::warn!("Failed to publish {key}: {err}");
            }
        }
    }
}

/// Map a state id and value onto a setting write.
///
/// Only the last `.`-separated segment of the id is significant.
pub fn parse_setting_change(id: &str, value: &StateValue) -> Option<SettingChange> {
    let name = id.rsplit('.').next().unwrap_or(id);
    let key = SettingKey::from_str(name).ok()?;
    let numeric = value.as_i64();
    if key.takes_value() && numeric.is_none() {
        log::warn!("Ignoring non-numeric value {value} for {name}");
        return None;
    }
    SettingChange::new(key, numeric)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join("")
}
