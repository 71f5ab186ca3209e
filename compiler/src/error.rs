// error.rs — Graph construction and encoding errors
//
// One error enum for the whole build-and-encode path. Decoding has its own
// error type in `decode.rs`; the two never mix because a decode failure is a
// bad input file while these are bad construction calls (or, for
// `UnknownConstantOrNode`, a broken internal invariant).

use std::fmt;

/// Errors produced while constructing units, registering nodes, or encoding
/// a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Malformed construction call: empty bundle, bundle nested where a
    /// scalar is required, more arguments than signature slots, illegal
    /// graph root, output slot past the referenced node's outputs, or a
    /// table that no longer fits its u16 wire width.
    InvalidArgument { reason: String },

    /// An argument was omitted and the signature slot declares no default.
    MissingDefault { unit: String, param: String },

    /// Registration re-entered a node that is still being registered.
    CyclicGraph { unit: String },

    /// A constant or node lookup missed while resolving wire indices.
    /// Inputs are interned during registration, so this cannot be provoked
    /// by a caller; it means an invariant was broken upstream.
    UnknownConstantOrNode { detail: String },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::InvalidArgument { reason } => {
                write!(f, "invalid argument: {}", reason)
            }
            GraphError::MissingDefault { unit, param } => {
                write!(
                    f,
                    "missing value for parameter '{}' of {} (no default declared)",
                    param, unit
                )
            }
            GraphError::CyclicGraph { unit } => {
                write!(
                    f,
                    "cyclic graph: registration re-entered {} before it was committed",
                    unit
                )
            }
            GraphError::UnknownConstantOrNode { detail } => {
                write!(f, "unknown constant or node: {}", detail)
            }
        }
    }
}

impl std::error::Error for GraphError {}
