//! Per-type block codecs.
//!
//! One encoder and one decoder per block type, all driving the same bit
//! stream. Encoders emit big-endian bit groups; decoders consume them in
//! the same order, so a round trip reproduces the value up to each type's
//! documented precision loss.

mod decode;
mod encode;
mod error;

pub use decode::{decode_block, decode_blocklist};
pub use encode::{encode_block, encode_blocklist};
pub use error::{DecodeError, EncodeError};

pub(crate) use decode::decode_static;
pub(crate) use encode::encode_static;
