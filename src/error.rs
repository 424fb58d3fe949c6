//! Crate-level error type.
//!
//! Unit operations never fail: bad widths are masked and unsupported events
//! are ignored. Errors only come from the edges: serialization, config and
//! program files, and user-supplied text.

use thiserror::Error;

use crate::input::InputError;
use crate::isa::ProgramError;
use crate::unit::register::UnknownNextSource;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to deserialize snapshot: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("invalid event: {0}")]
    Event(#[source] serde_json::Error),

    #[error(transparent)]
    NextSource(#[from] UnknownNextSource),

    #[error("invalid config {path}: {message}")]
    Config { path: String, message: String },

    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
