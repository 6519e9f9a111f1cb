//! Non-fatal contract violations.
//!
//! The engine never raises any of these to its caller. Each violation is
//! reported through the host's logger capability and the operation in
//! progress continues best-effort; the host decides whether to escalate.

use thiserror::Error;

/// All violations the engine can report through the logger capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// Key derivation was asked for an empty descriptor id. The empty
    /// label is used as a sentinel and derivation proceeds.
    #[error("operation label is empty; deriving a key from the empty label")]
    LabelError,

    /// A required parameter was absent when validating an instance's
    /// params. A `Null` value is valid; only absence violates. Validation
    /// returns the params that were resolvable.
    #[error("required param '{param}' for '{descriptor_id}' is missing")]
    MissingRequiredParam {
        descriptor_id: String,
        param: String,
    },

    /// A descriptor was registered without a descriptor id. The record is
    /// registered anyway.
    #[error("descriptor registered without a descriptor id")]
    MissingDescriptorId,

    /// An operation record handed back for re-dispatch lacks a descriptor
    /// id. The event is still produced with whatever fields it has.
    #[error("operation record lacks a descriptor id and cannot be routed on re-dispatch")]
    MissingDescriptorIdOnDispatch,

    /// A record at a store boundary breaks the read/write shape invariant
    /// (read records carry `data_status`, write records do not). The
    /// write proceeds.
    #[error("operation record at '{key}' has a malformed shape: {message}")]
    RecordShape { key: String, message: String },

    /// A parent-descriptor chain exceeded the recursion bound. Parent
    /// chains must be acyclic; the ascent stops at the bound.
    #[error("parent chain above '{descriptor_id}' exceeded depth {depth}; stopping ascent")]
    ParentDepthExceeded {
        descriptor_id: String,
        depth: usize,
    },
}
