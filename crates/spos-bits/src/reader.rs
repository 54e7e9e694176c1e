//! Positional bit reader.

use crate::{BitError, Bits};

/// Reads big-endian bit groups from a bit string, tracking a cursor.
#[derive(Debug)]
pub struct BitReader<'a> {
    bits: &'a Bits,
    cursor: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bits: &'a Bits) -> Self {
        Self { bits, cursor: 0 }
    }

    /// Current cursor position in bits.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bits left to read.
    pub fn remaining(&self) -> usize {
        self.bits.len() - self.cursor
    }

    /// Reads `width` bits MSB first, advancing the cursor.
    pub fn read(&mut self, width: u32) -> Result<u64, BitError> {
        if width > 64 {
            return Err(BitError::WidthOverflow(width));
        }
        let value = self.peek(width)?;
        self.cursor += width as usize;
        Ok(value)
    }

    /// Reads `width` bits without advancing the cursor.
    pub fn peek(&self, width: u32) -> Result<u64, BitError> {
        if width > 64 {
            return Err(BitError::WidthOverflow(width));
        }
        if self.remaining() < width as usize {
            return Err(BitError::Truncated {
                needed: width,
                offset: self.cursor,
                available: self.remaining(),
            });
        }
        let mut value = 0u64;
        for i in 0..width as usize {
            value = (value << 1) | u64::from(self.bits.get(self.cursor + i));
        }
        Ok(value)
    }

    /// Consumes `width` bits and discards them.
    pub fn skip(&mut self, width: u32) -> Result<(), BitError> {
        self.read(width).map(|_| ())
    }
}
