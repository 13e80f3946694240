//! Collaborator interfaces of the polling engine
//!
//! The engine only talks to the outside world through these traits, so it can
//! be driven by a real serial port and state store, or by in-memory doubles.
use anyhow::Result;

use crate::state::StateValue;

/// Byte-level link to the sensor.
///
/// Received frames are delivered separately, as events, once the link has
/// seen enough silence to consider a frame complete.
pub trait Transport: Send {
    /// Queue a finished frame for sending.
    fn write(&self, frame: &[u8]) -> Result<()>;

    /// Close the link. Calling this more than once must be harmless.
    fn close(&self) -> Result<()>;
}

/// Destination of decoded values, keyed by state id.
pub trait StateSink: Send + Sync {
    fn set_value(&self, key: &str, value: StateValue, ack: bool) -> Result<()>;
}

impl<S: StateSink + ?Sized> StateSink for std::sync::Arc<S> {
    fn set_value(&self, key: &str, value: StateValue, ack: bool) -> Result<()> {
        (**self).set_value(key, value, ack)
    }
}
