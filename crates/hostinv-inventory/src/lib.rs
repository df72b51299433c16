//! hostinv-inventory: instance-text parsing and inventory probes
//!
//! Turns the management interface's textual instance records into typed
//! values and groups them into per-probe content mappings.

pub mod error;
pub mod mof;
pub mod probe;
pub mod probes;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use error::InventoryError;
pub use mof::{Instance, ParseError, parse, parse_instance, render_instance};
pub use probe::Probe;
pub use types::{Content, ParsedRecord, ValueLiteral};
