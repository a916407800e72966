//! Error classification shared by every error type in the engine.
//!
//! Each error enum maps onto one [`ErrorKind`], which is what an outer surface (e.g. an HTTP layer) needs to pick a
//! response status. The kinds are deliberately coarse: callers that need detail match on the concrete error instead.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input, or input that fails a business rule (wrong recipient, amount below the fee).
    Validation,
    NotFound,
    /// The caller does not own the resource or the resource is not usable by them.
    Forbidden,
    /// The request races or repeats a state change that has already happened.
    Conflict,
    /// The chain RPC endpoint or the scoring capability failed or timed out.
    UpstreamUnavailable,
    /// A collaborator returned a response that could not be interpreted, or stored data could not be decoded.
    DataIntegrity,
    /// Storage failures and other faults the caller cannot fix.
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::NotFound => "not found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::UpstreamUnavailable => "upstream unavailable",
            ErrorKind::DataIntegrity => "data integrity error",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}
