//! Aggregate error type for the SPOS entry points.

use spos_bits::BitError;
use thiserror::Error;

use crate::block::SpecError;
use crate::codec::{DecodeError, EncodeError};
use crate::message::SpecsVersionError;

/// Any error the codec can surface.
///
/// The entry points (`encode`, `decode`, `decode_from_specs`) return this
/// aggregate; the per-concern enums stay available for callers that match
/// on specific failures.
#[derive(Debug, Error)]
pub enum SposError {
    #[error("payload spec error: {0}")]
    Spec(#[from] SpecError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("spec set error: {0}")]
    SpecsVersion(#[from] SpecsVersionError),
}

impl From<BitError> for SposError {
    fn from(err: BitError) -> Self {
        SposError::Decode(DecodeError::from(err))
    }
}
