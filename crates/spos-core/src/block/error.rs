//! Spec validation error type.

use thiserror::Error;

use crate::codec::EncodeError;

/// Raised when a payload spec or one of its blocks is malformed.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("{context}: expected a JSON object")]
    NotAnObject { context: String },
    #[error("{context}: missing required key `{key}`")]
    MissingKey { context: String, key: &'static str },
    #[error("{context}: unexpected key `{key}`")]
    UnexpectedKey { context: String, key: String },
    #[error("{context}: `{key}` must be {expected}")]
    WrongType {
        context: String,
        key: String,
        expected: &'static str,
    },
    #[error("block `{key}`: unknown type `{type_name}`")]
    UnknownBlockType { key: String, type_name: String },
    #[error("block `{key}`: width of {bits} bits is outside 1..=64")]
    BadWidth { key: String, bits: i64 },
    #[error("block `{key}`: `steps` must be strictly ascending")]
    StepsNotAscending { key: String },
    #[error("block `{key}`: `steps_names` must have {expected} entries")]
    StepsNamesLength { key: String, expected: usize },
    #[error("block `{key}`: `{what}` must not be empty")]
    EmptyList { key: String, what: &'static str },
    #[error("block `{key}`: duplicate category `{category}`")]
    DuplicateCategory { key: String, category: String },
    #[error("duplicate output name `{name}` in blocklist")]
    DuplicateBlockKey { name: String },
    #[error("version {version} does not fit in {bits} version bits")]
    VersionOverflow { version: u64, bits: u32 },
    #[error("block `{key}`: static value cannot be encoded: {source}")]
    StaticValue {
        key: String,
        #[source]
        source: Box<EncodeError>,
    },
    #[error("no payload spec with version {version}")]
    UnknownVersion { version: u64 },
}
