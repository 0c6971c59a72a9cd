//! Error taxonomy shared by every codec in the crate.
//!
//! All failures surface through [`CodecError`]; there is no nested recovery
//! inside the codecs. On any error the state of the output is unspecified
//! and callers must not consume it.

use std::io;

use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    /// The bit or byte source ran out mid-codeword.
    #[error("unexpected end of input")]
    EndOfInput,

    /// A universal code cannot represent the value within 64 bits.
    #[error("universal code does not fit into 64 bits")]
    Overflow,

    /// A section or blob was written by a format revision this build does
    /// not understand.
    #[error("unsupported format version: expected {expected}, got {got}")]
    UnsupportedVersion { expected: u16, got: u16 },

    /// A decoded biased count or delta in a restriction stream was invalid.
    #[error("corrupt restriction stream: {0}")]
    CorruptRestriction(&'static str),

    /// Caller-provided restrictions violate the serializer's input
    /// invariants (sortedness, partitioning, link validity).
    #[error("restriction input rejected: {0}")]
    InvalidRestriction(String),

    /// A traffic-keys blob decoded to an inconsistent grouping or left
    /// trailing bytes.
    #[error("corrupt traffic keys: {0}")]
    CorruptKeys(String),

    /// Caller-provided traffic keys are not a sorted, dense grouping.
    #[error("inconsistent traffic keys: {0}")]
    InconsistentKeys(String),

    /// A traffic-values blob disagrees with its declared value count.
    #[error("corrupt traffic values: {0}")]
    CorruptValues(String),

    #[error("inflate failed: {0}")]
    InflateFailed(#[source] io::Error),

    #[error("deflate failed: {0}")]
    DeflateFailed(#[source] io::Error),

    /// The underlying sink or source failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
