//! Host helpers that do not belong to the protocol itself

pub mod ports;

pub use ports::*;
