//! Block encoders.

use serde_json::Value;
use spos_bits::{BitWriter, Bits};

use super::error::EncodeError;
use crate::alphabet;
use crate::block::{
    Approximation, ArrayBlock, BlockDef, BlockKind, CategoriesBlock, FloatBlock, IntegerBlock,
    IntegerMode, StepsBlock, StringBlock,
};
use crate::resolve;

/// Encodes one block into `writer`.
///
/// Static blocks ignore `value` and emit their pre-encoded bits; pad
/// blocks take no input at all.
pub fn encode_block(
    block: &BlockDef,
    value: Option<&Value>,
    writer: &mut BitWriter,
) -> Result<(), EncodeError> {
    if let Some(cache) = &block.static_cache {
        writer.append_bits(&cache.bits);
        return Ok(());
    }
    if let BlockKind::Pad { bits } = block.kind {
        writer.pad(bits);
        return Ok(());
    }
    let value = value.ok_or_else(|| EncodeError::MissingKey {
        key: block.key.clone(),
    })?;
    encode_value(block, value, writer)
}

/// Encodes a blocklist in order, resolving each block's value from `data`
/// by its dot-path key.
pub fn encode_blocklist(
    blocks: &[BlockDef],
    data: &Value,
    writer: &mut BitWriter,
) -> Result<(), EncodeError> {
    for block in blocks {
        if block.static_cache.is_some() || matches!(block.kind, BlockKind::Pad { .. }) {
            encode_block(block, None, writer)?;
            continue;
        }
        let value =
            resolve::get_path(data, &block.key).ok_or_else(|| EncodeError::MissingKey {
                key: block.key.clone(),
            })?;
        encode_block(block, Some(value), writer)?;
    }
    Ok(())
}

/// Encodes a value under `block` into a standalone bit string. Used to
/// pre-encode static values at spec compile time.
pub(crate) fn encode_static(block: &BlockDef, value: &Value) -> Result<Bits, EncodeError> {
    let mut writer = BitWriter::new();
    encode_value(block, value, &mut writer)?;
    Ok(writer.finish())
}

fn encode_value(block: &BlockDef, value: &Value, writer: &mut BitWriter) -> Result<(), EncodeError> {
    let key = &block.key;
    match &block.kind {
        BlockKind::Boolean => {
            writer.append(u64::from(coerce_bool(key, value)?), 1);
            Ok(())
        }
        BlockKind::Binary { bits } => encode_binary(key, *bits, value, writer),
        BlockKind::Integer(b) => encode_integer(key, b, value, writer),
        BlockKind::Float(b) => encode_float(key, b, value, writer),
        BlockKind::Pad { bits } => {
            writer.pad(*bits);
            Ok(())
        }
        BlockKind::String(b) => encode_string(key, b, value, writer),
        BlockKind::Steps(b) => encode_steps(key, b, value, writer),
        BlockKind::Categories(b) => encode_categories(key, b, value, writer),
        BlockKind::Array(b) => encode_array(key, b, value, writer),
        BlockKind::Object { blocklist } => {
            if !value.is_object() {
                return Err(EncodeError::WrongType {
                    key: key.clone(),
                    expected: "an object",
                });
            }
            encode_blocklist(blocklist, value, writer)
        }
    }
}

fn coerce_bool(key: &str, value: &Value) -> Result<bool, EncodeError> {
    if let Some(b) = value.as_bool() {
        return Ok(b);
    }
    coerce_int(key, value)
        .map(|n| n != 0)
        .map_err(|_| EncodeError::WrongType {
            key: key.to_owned(),
            expected: "a boolean or integer",
        })
}

fn coerce_int(key: &str, value: &Value) -> Result<i128, EncodeError> {
    let n = match value {
        Value::Number(n) => n,
        _ => {
            return Err(EncodeError::WrongType {
                key: key.to_owned(),
                expected: "an integer",
            })
        }
    };
    if let Some(i) = n.as_i64() {
        return Ok(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(i128::from(u));
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i128),
        _ => Err(EncodeError::WrongType {
            key: key.to_owned(),
            expected: "an integer",
        }),
    }
}

fn coerce_float(key: &str, value: &Value) -> Result<f64, EncodeError> {
    match value.as_f64() {
        Some(f) if !f.is_nan() => Ok(f),
        _ => Err(EncodeError::WrongType {
            key: key.to_owned(),
            expected: "a number",
        }),
    }
}

fn encode_binary(
    key: &str,
    bits: u32,
    value: &Value,
    writer: &mut BitWriter,
) -> Result<(), EncodeError> {
    let literal = value.as_str().ok_or_else(|| EncodeError::WrongType {
        key: key.to_owned(),
        expected: "a `0b` or `0x` string",
    })?;
    let raw = parse_bit_literal(key, literal)?;
    // Minimal form of the literal's integer value: leading zeros are not
    // significant.
    let start = raw.iter().position(|&b| b).unwrap_or(raw.len() - 1);
    let minimal = &raw[start..];
    let width = bits as usize;
    if minimal.len() >= width {
        // Keep the high-order bits, drop the rest.
        for &bit in &minimal[..width] {
            writer.append(u64::from(bit), 1);
        }
    } else {
        writer.pad((width - minimal.len()) as u32);
        for &bit in minimal {
            writer.append(u64::from(bit), 1);
        }
    }
    Ok(())
}

fn parse_bit_literal(key: &str, literal: &str) -> Result<Vec<bool>, EncodeError> {
    let bad = || EncodeError::BadBinaryLiteral {
        key: key.to_owned(),
        value: literal.to_owned(),
    };
    if let Some(digits) = literal.strip_prefix("0b") {
        if digits.is_empty() {
            return Err(bad());
        }
        digits
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(bad()),
            })
            .collect()
    } else if let Some(digits) = literal.strip_prefix("0x").or_else(|| literal.strip_prefix("0X"))
    {
        if digits.is_empty() {
            return Err(bad());
        }
        let mut out = Vec::with_capacity(digits.len() * 4);
        for c in digits.chars() {
            let nibble = c.to_digit(16).ok_or_else(bad)?;
            for shift in (0..4).rev() {
                out.push((nibble >> shift) & 1 == 1);
            }
        }
        Ok(out)
    } else {
        Err(bad())
    }
}

fn encode_integer(
    key: &str,
    b: &IntegerBlock,
    value: &Value,
    writer: &mut BitWriter,
) -> Result<(), EncodeError> {
    let shifted = coerce_int(key, value)? - i128::from(b.offset);
    let max = (1i128 << b.bits) - 1;
    let encoded = match b.mode {
        IntegerMode::Truncate => shifted.clamp(0, max),
        IntegerMode::Remainder => shifted.rem_euclid(max + 1),
    };
    writer.append(encoded as u64, b.bits);
    Ok(())
}

fn encode_float(
    key: &str,
    b: &FloatBlock,
    value: &Value,
    writer: &mut BitWriter,
) -> Result<(), EncodeError> {
    let x = coerce_float(key, value)?;
    let overflow = ((1u128 << b.bits) - 1) as f64;
    let scaled = overflow * (x - b.lower) / (b.upper - b.lower);
    let clamped = scaled.clamp(0.0, overflow);
    let index = match b.approximation {
        Approximation::Round => clamped.round_ties_even(),
        Approximation::Floor => clamped.floor(),
        Approximation::Ceil => clamped.ceil(),
    };
    writer.append(index as u64, b.bits);
    Ok(())
}

fn encode_string(
    key: &str,
    b: &StringBlock,
    value: &Value,
    writer: &mut BitWriter,
) -> Result<(), EncodeError> {
    let s = value.as_str().ok_or_else(|| EncodeError::WrongType {
        key: key.to_owned(),
        expected: "a string",
    })?;
    let mut count = 0;
    for ch in s.chars().take(b.length) {
        writer.append(
            u64::from(alphabet::index_of(ch, &b.custom_alphabeth)),
            6,
        );
        count += 1;
    }
    for _ in count..b.length {
        writer.append(u64::from(alphabet::FALLBACK_INDEX), 6);
    }
    Ok(())
}

fn encode_steps(
    key: &str,
    b: &StepsBlock,
    value: &Value,
    writer: &mut BitWriter,
) -> Result<(), EncodeError> {
    let x = coerce_float(key, value)?;
    writer.append(b.bucket_of(x), b.bits);
    Ok(())
}

fn encode_categories(
    key: &str,
    b: &CategoriesBlock,
    value: &Value,
    writer: &mut BitWriter,
) -> Result<(), EncodeError> {
    let s = value.as_str().ok_or_else(|| EncodeError::WrongType {
        key: key.to_owned(),
        expected: "a string",
    })?;
    let index = match b.categories.iter().position(|c| c == s) {
        Some(i) => i as u64,
        None if b.error.is_some() => b.categories.len() as u64,
        None => {
            return Err(EncodeError::UnknownCategory {
                key: key.to_owned(),
                value: s.to_owned(),
            })
        }
    };
    writer.append(index, b.bits);
    Ok(())
}

fn encode_array(
    key: &str,
    b: &ArrayBlock,
    value: &Value,
    writer: &mut BitWriter,
) -> Result<(), EncodeError> {
    let items = value.as_array().ok_or_else(|| EncodeError::WrongType {
        key: key.to_owned(),
        expected: "an array",
    })?;
    if b.fixed {
        if items.len() != b.length {
            return Err(EncodeError::LengthMismatch {
                key: key.to_owned(),
                len: items.len(),
                expected: b.length,
            });
        }
    } else {
        if items.len() > b.length {
            return Err(EncodeError::TooManyElements {
                key: key.to_owned(),
                len: items.len(),
                max: b.length,
            });
        }
        writer.append(items.len() as u64, b.prefix_bits);
    }
    for item in items {
        encode_block(&b.blocks, Some(item), writer)?;
    }
    Ok(())
}
