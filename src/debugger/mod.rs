//! Host Inspection
//!
//! JSON state access for components a host debugger wants to inspect
//! while a trap has the machine parked. Components expose their
//! serde-derived state as a [`serde_json::Value`]; runtime-only fields
//! (opcode tables, installed alarm ids) are skipped on the way out and
//! restored from the live component on the way back in.

use serde_json::Value;

use crate::clock::ClockDomain;
use crate::cpu::Cpu;
use crate::memory::Bus;

/// A component whose state can be read and written as JSON.
pub trait Debuggable {
    /// Read the component's state as a JSON value.
    fn read_state(&self) -> Value;

    /// Overwrite the component's state from a JSON value. Malformed
    /// input leaves the component untouched.
    fn write_state(&mut self, state: &Value);
}

impl Debuggable for Cpu {
    fn read_state(&self) -> Value {
        serde_json::to_value(self).unwrap()
    }

    fn write_state(&mut self, state: &Value) {
        if let Ok(new_cpu) = serde_json::from_value(state.clone()) {
            *self = new_cpu;
        }
    }
}

impl Debuggable for ClockDomain {
    fn read_state(&self) -> Value {
        serde_json::to_value(self).unwrap()
    }

    fn write_state(&mut self, state: &Value) {
        if let Ok(new_domain) = serde_json::from_value(state.clone()) {
            *self = new_domain;
        }
    }
}

impl Debuggable for Bus {
    fn read_state(&self) -> Value {
        serde_json::to_value(self).unwrap()
    }

    fn write_state(&mut self, state: &Value) {
        if let Ok(mut new_bus) = serde_json::from_value::<Bus>(state.clone()) {
            // ROM and alarm bindings are runtime wiring, not snapshot
            // state; carry them over from the live bus.
            new_bus.carry_runtime_state(self);
            *self = new_bus;
        }
    }
}
