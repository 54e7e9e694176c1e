//! Block decoders.

use serde_json::{Map, Value};
use spos_bits::{BitReader, Bits};
use tracing::warn;

use super::error::DecodeError;
use crate::alphabet;
use crate::block::{
    ArrayBlock, BlockDef, BlockKind, CategoriesBlock, FloatBlock, IntegerBlock, StepsBlock,
    StringBlock,
};

/// Decodes one block from `reader`.
///
/// Returns `None` for pad blocks, which consume bits but surface no value.
/// Blocks with a static value consume their wire bits and always surface
/// the spec's projection; a mismatch between the two is logged.
pub fn decode_block(block: &BlockDef, reader: &mut BitReader) -> Result<Option<Value>, DecodeError> {
    if let Some(cache) = &block.static_cache {
        let wire = decode_value(block, reader)?;
        if wire != cache.projected {
            warn!(
                key = %block.key,
                wire = %wire,
                expected = %cache.projected,
                "decoded value does not match the spec's static value",
            );
        }
        return Ok(Some(cache.projected.clone()));
    }
    if let BlockKind::Pad { bits } = block.kind {
        skip_bits(reader, bits)?;
        return Ok(None);
    }
    decode_value(block, reader).map(Some)
}

/// Decodes a blocklist in order into an object keyed by each block's
/// output name.
pub fn decode_blocklist(
    blocks: &[BlockDef],
    reader: &mut BitReader,
) -> Result<Map<String, Value>, DecodeError> {
    let mut out = Map::new();
    for block in blocks {
        if let Some(value) = decode_block(block, reader)? {
            out.insert(block.output_name().to_owned(), value);
        }
    }
    Ok(out)
}

/// Decodes a standalone bit string under `block`. Used to compute the
/// projection of a static value at spec compile time.
pub(crate) fn decode_static(block: &BlockDef, bits: &Bits) -> Result<Value, DecodeError> {
    let mut reader = BitReader::new(bits);
    decode_value(block, &mut reader)
}

fn decode_value(block: &BlockDef, reader: &mut BitReader) -> Result<Value, DecodeError> {
    match &block.kind {
        BlockKind::Boolean => Ok(Value::Bool(reader.read(1)? == 1)),
        BlockKind::Binary { bits } => {
            let raw = reader.read(*bits)?;
            Ok(Value::String(format!(
                "0b{raw:0width$b}",
                width = *bits as usize
            )))
        }
        BlockKind::Integer(b) => decode_integer(b, reader),
        BlockKind::Float(b) => decode_float(b, reader),
        BlockKind::Pad { bits } => {
            skip_bits(reader, *bits)?;
            Ok(Value::Null)
        }
        BlockKind::String(b) => decode_string(b, reader),
        BlockKind::Steps(b) => decode_steps(b, reader),
        BlockKind::Categories(b) => decode_categories(b, reader),
        BlockKind::Array(b) => decode_array(&block.key, b, reader),
        BlockKind::Object { blocklist } => {
            Ok(Value::Object(decode_blocklist(blocklist, reader)?))
        }
    }
}

fn skip_bits(reader: &mut BitReader, bits: u32) -> Result<(), DecodeError> {
    reader.skip(bits)?;
    Ok(())
}

fn decode_integer(b: &IntegerBlock, reader: &mut BitReader) -> Result<Value, DecodeError> {
    let raw = reader.read(b.bits)?;
    let value = i128::from(raw) + i128::from(b.offset);
    Ok(number_from_i128(value))
}

fn decode_float(b: &FloatBlock, reader: &mut BitReader) -> Result<Value, DecodeError> {
    let raw = reader.read(b.bits)? as f64;
    let overflow = ((1u128 << b.bits) - 1) as f64;
    let value = raw * (b.upper - b.lower) / overflow + b.lower;
    Ok(Value::from(value))
}

fn decode_string(b: &StringBlock, reader: &mut BitReader) -> Result<Value, DecodeError> {
    let mut s = String::with_capacity(b.length);
    for _ in 0..b.length {
        let index = reader.read(6)? as u8;
        s.push(alphabet::char_at(index, &b.custom_alphabeth));
    }
    Ok(Value::String(s))
}

fn decode_steps(b: &StepsBlock, reader: &mut BitReader) -> Result<Value, DecodeError> {
    let index = reader.read(b.bits)? as usize;
    let name = b
        .names
        .get(index)
        .map(String::as_str)
        .unwrap_or("error");
    Ok(Value::String(name.to_owned()))
}

fn decode_categories(b: &CategoriesBlock, reader: &mut BitReader) -> Result<Value, DecodeError> {
    let index = reader.read(b.bits)? as usize;
    let name = if index < b.categories.len() {
        b.categories[index].as_str()
    } else if index == b.categories.len() {
        b.error.as_deref().unwrap_or("error")
    } else {
        "error"
    };
    Ok(Value::String(name.to_owned()))
}

fn decode_array(key: &str, b: &ArrayBlock, reader: &mut BitReader) -> Result<Value, DecodeError> {
    let count = if b.fixed {
        b.length as u64
    } else {
        let count = reader.read(b.prefix_bits)?;
        if count > b.length as u64 {
            return Err(DecodeError::CountOverflow {
                key: key.to_owned(),
                count,
                max: b.length,
            });
        }
        count
    };
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        items.push(decode_block(&b.blocks, reader)?.unwrap_or(Value::Null));
    }
    Ok(Value::Array(items))
}

fn number_from_i128(value: i128) -> Value {
    if let Ok(i) = i64::try_from(value) {
        Value::from(i)
    } else if let Ok(u) = u64::try_from(value) {
        Value::from(u)
    } else {
        Value::from(value as f64)
    }
}
