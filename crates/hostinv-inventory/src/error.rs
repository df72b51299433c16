//! Error types for hostinv-inventory

use hostinv_exec::ExecError;
use thiserror::Error;

use crate::mof::ParseError;

/// Errors that can occur while a probe gathers and normalizes data
#[derive(Error, Debug, Clone)]
pub enum InventoryError {
    /// Instance text could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The management interface call failed
    #[error("interface error: {0}")]
    Interface(#[from] ExecError),

    /// A record lacks the property used to group it
    #[error("{class} record has no usable {field} property")]
    MissingField {
        /// Management class
        class: String,
        /// Property name
        field: String,
    },

    /// A property holds a value the probe cannot use
    #[error("unexpected value for {field}: {detail}")]
    UnexpectedValue {
        /// Property name
        field: String,
        /// What was wrong
        detail: String,
    },

    /// Probe name not in the catalogue
    #[error("unknown probe: {0}")]
    UnknownProbe(String),
}
