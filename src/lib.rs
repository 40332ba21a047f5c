//! Punctual - a cycle-exact multi-domain timing core for retro-computer emulation
//!
//! This library provides the clock, alarm, and cross-domain synchronization
//! machinery that lets independently clocked CPUs execute deterministically.

pub mod alarm;
pub mod clock;
pub mod cpu;
pub mod debugger;
pub mod machine;
pub mod memory;
pub mod sync;
pub mod timer;

pub use alarm::{AlarmContext, AlarmId, Fired};
pub use clock::{Clock, ClockDomain, ClockGuard, NEVER};
pub use cpu::Cpu;
pub use machine::{Drive, DriveConfig, Machine, MachineConfig};
pub use memory::Bus;
pub use sync::ClockBridge;
