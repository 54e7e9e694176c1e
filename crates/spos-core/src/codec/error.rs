//! Encode/decode error types.

use spos_bits::BitError;
use thiserror::Error;

/// Raised when an input value cannot be encoded under its block.
///
/// Saturation is not an error; these are the hard failures (wrong type,
/// missing key, no representable slot).
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("payload data must be a JSON object")]
    NotAnObject,
    #[error("missing value for key `{key}`")]
    MissingKey { key: String },
    #[error("value for block `{key}` must be {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("value for block `{key}` must be a `0b` or `0x` literal, got `{value}`")]
    BadBinaryLiteral { key: String, value: String },
    #[error("value `{value}` is not a category of block `{key}`")]
    UnknownCategory { key: String, value: String },
    #[error("array `{key}` has {len} elements, more than the maximum {max}")]
    TooManyElements { key: String, len: usize, max: usize },
    #[error("fixed array `{key}` needs exactly {expected} elements, got {len}")]
    LengthMismatch {
        key: String,
        len: usize,
        expected: usize,
    },
}

/// Raised when a message cannot be decoded under a spec.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Bits(#[from] BitError),
    #[error("crc mismatch: computed {computed:#04x}, message carries {received:#04x}")]
    CrcMismatch { computed: u8, received: u8 },
    #[error("message version {found} does not match spec version {expected}")]
    VersionMismatch { expected: u64, found: u64 },
    #[error("array `{key}` count prefix {count} exceeds the maximum {max}")]
    CountOverflow { key: String, count: u64, max: usize },
    #[error("crc-framed message must be a whole number of bytes, got {bits} bits")]
    NotByteAligned { bits: usize },
}
