// ── Core error types ──
//
// Two families. `FrameError` describes why a single gateway frame was
// discarded; it never leaves an entity callback and is surfaced to callers
// only through the typed `Outcome` values the entities return. `CoreError`
// covers attach-time failures that the host must handle.

use thiserror::Error;

/// Why a frame (or part of one) could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` has the wrong type: expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` is not a valid integer: {value:?}")]
    BadInteger { field: &'static str, value: String },

    #[error("field `{field}` is too short for a sequence number: {value:?}")]
    Truncated { field: &'static str, value: String },

    #[error("frame does not match any known category")]
    Unrecognized,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Entity `{entity_id}` needs a Tokio runtime to schedule deferred work")]
    NoRuntime { entity_id: String },

    #[error("Invalid device identifier {identifier:?}: {reason}")]
    InvalidIdentifier { identifier: String, reason: String },
}
