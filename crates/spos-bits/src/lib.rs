//! Bit-aligned buffer primitives for SPOS.
//!
//! Messages on bandwidth-constrained links are not byte-aligned, so the
//! encoder and decoder work over a contiguous bit string. This crate
//! provides:
//!
//! - [`BitWriter`] - append-only writer emitting big-endian bit groups
//! - [`BitReader`] - positional reader consuming groups in write order
//! - [`Bits`] - an owned bit string with conversions to and from the
//!   external message representations (`0b…` literal, `0x…` literal,
//!   raw bytes)
//!
//! # Example
//!
//! ```
//! use spos_bits::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.append(0b10, 2);
//! writer.append(13, 6);
//! let bits = writer.finish();
//! assert_eq!(bits.to_bin_literal(), "0b10001101");
//!
//! let mut reader = BitReader::new(&bits);
//! assert_eq!(reader.read(2).unwrap(), 0b10);
//! assert_eq!(reader.read(6).unwrap(), 13);
//! ```

mod bits;
mod reader;
mod writer;

pub use bits::{Bits, MessageFormat};
pub use reader::BitReader;
pub use writer::BitWriter;

use thiserror::Error;

/// Error type for bit buffer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BitError {
    /// The reader ran past the end of the message.
    #[error("message truncated: needed {needed} bits at offset {offset}, {available} available")]
    Truncated {
        needed: u32,
        offset: usize,
        available: usize,
    },
    /// A group wider than 64 bits was requested.
    #[error("bit group of {0} bits exceeds the 64-bit limit")]
    WidthOverflow(u32),
    /// A message literal could not be parsed.
    #[error("invalid message literal: {0}")]
    BadLiteral(String),
}
