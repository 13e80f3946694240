//! Ready-made state sinks
//!
//! `MemoryStateStore` keeps the latest value per key and `StdoutSink` prints
//! values for the CLI.
use anyhow::Result;
use parking_lot::Mutex;
use std::{collections::HashMap, io::Write};

use super::traits::StateSink;
use crate::state::{StateUpdate, StateValue};

/// In-memory store holding the latest value of every key plus the write history
#[derive(Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, (StateValue, bool)>>,
    history: Mutex<Vec<StateUpdate>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StateValue> {
        self.values.lock().get(key).map(|(v, _)| v.clone())
    }

    pub fn is_acknowledged(&self, key: &str) -> Option<bool> {
        self.values.lock().get(key).map(|(_, ack)| *ack)
    }

    /// All writes in the order they happened.
    pub fn history(&self) -> Vec<StateUpdate> {
        self.history.lock().clone()
    }
}

impl StateSink for MemoryStateStore {
    fn set_value(&self, key: &str, value: StateValue, ack: bool) -> Result<()> {
        self.history
            .lock()
            .push(StateUpdate::new(key, value.clone(), ack));
        self.values.lock().insert(key.to_string(), (value, ack));
        Ok(())
    }
}

/// Prints every update to stdout, either as `key = value` or as JSON lines
pub struct StdoutSink {
    json: bool,
}

impl StdoutSink {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl StateSink for StdoutSink {
    fn set_value(&self, key: &str, value: StateValue, ack: bool) -> Result<()> {
        let mut out = std::io::stdout().lock();
        if self.json {
            let update = StateUpdate::new(key, value, ack);
            writeln!(out, "{}", serde_json::to_string(&update)?)?;
        } else {
            writeln!(out, "{key} = {value}")?;
        }
        out.flush()?;
        Ok(())
    }
}
