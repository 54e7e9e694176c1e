//! Six-bit character alphabet for string blocks.
//!
//! String blocks spend six bits per character, indexing into the standard
//! base-64 table. Two substitutions make free-form text survive the trip:
//! spaces encode as index 62 (`+`) and any character outside the table
//! falls back to index 63 (`/`).

/// Standard base-64 alphabet, index order.
pub const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Index spaces are mapped to on encode.
pub const SPACE_INDEX: u8 = 62;

/// Index for characters outside the alphabet, and the padding index.
pub const FALLBACK_INDEX: u8 = 63;

/// Character used to pad short inputs up to the block length.
pub const PAD_CHAR: char = '/';

/// Returns the six-bit index for `ch` under the standard table plus the
/// space substitution. `overrides` (index, char) pairs win over everything.
pub fn index_of(ch: char, overrides: &[(u8, char)]) -> u8 {
    if let Some(&(idx, _)) = overrides.iter().find(|&&(_, c)| c == ch) {
        return idx;
    }
    if ch == ' ' {
        return SPACE_INDEX;
    }
    ALPHABET
        .iter()
        .position(|&b| b as char == ch)
        .map(|i| i as u8)
        .unwrap_or(FALLBACK_INDEX)
}

/// Returns the character for six-bit `index`, honouring overrides.
pub fn char_at(index: u8, overrides: &[(u8, char)]) -> char {
    debug_assert!(index < 64);
    if let Some(&(_, ch)) = overrides.iter().find(|&&(i, _)| i == index) {
        return ch;
    }
    ALPHABET[index as usize & 63] as char
}
