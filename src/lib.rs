//! Omnicomm LLS fuel level sensor adapter
//!
//! The wire protocol (checksum, frame codec, scaling and setting commands)
//! lives in the `lls_protocol` package. This crate adds everything needed to
//! talk to a real sensor: the serial I/O thread, the polling engine that
//! decides what to send and publishes decoded values to a state sink, the
//! configuration layer and the command line frontend.

pub mod api;
#[doc(hidden)]
pub mod boot;
#[doc(hidden)]
pub mod cli;
pub mod config;
pub mod engine;
pub mod runtime;
pub mod state;
#[doc(hidden)]
pub mod utils;

pub use api::*;
pub use config::AdapterConfig;
pub use engine::{spawn_engine, EngineCommand, EngineHandle, Poller};
pub use lls_protocol as protocol;
pub use state::{StateUpdate, StateValue};
