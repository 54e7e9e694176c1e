//! Random payload generation for SPOS payload specs.
//!
//! Given a compiled spec, [`random_payload`] produces a valid random
//! `payload_data` object together with its encoding. Useful for
//! exercising a spec end to end before deploying it to a real link.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{Map, Value};
use spos_core::block::{BlockDef, BlockKind};
use spos_core::{encode, HeaderBlock, Message, MessageFormat, PayloadSpec, SposError};

const ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a valid random payload for `spec` and encodes it.
///
/// Static blocks and pads need no input and are skipped; dot-path keys
/// produce the nested objects the encoder expects.
pub fn random_payload(
    spec: &PayloadSpec,
    format: MessageFormat,
) -> Result<(Message, Value), SposError> {
    let mut rng = rand::thread_rng();
    let mut data = Map::new();
    for header in &spec.meta.header {
        if let HeaderBlock::Coded(block) = header {
            insert_random(&mut data, block, &mut rng);
        }
    }
    for block in &spec.body {
        insert_random(&mut data, block, &mut rng);
    }
    let data = Value::Object(data);
    let message = encode(&data, spec, format)?;
    Ok((message, data))
}

fn insert_random(data: &mut Map<String, Value>, block: &BlockDef, rng: &mut impl Rng) {
    if block.static_cache.is_some() || matches!(block.kind, BlockKind::Pad { .. }) {
        return;
    }
    insert_path(data, &block.key, random_value(block, rng));
}

/// Inserts `value` at a dot path, creating intermediate objects.
fn insert_path(data: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            data.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let entry = data
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}

fn random_value(block: &BlockDef, rng: &mut impl Rng) -> Value {
    match &block.kind {
        BlockKind::Boolean => Value::Bool(rng.gen_bool(0.5)),
        BlockKind::Binary { bits } => {
            let mut literal = String::with_capacity(*bits as usize + 2);
            literal.push_str("0b");
            for _ in 0..*bits {
                literal.push(if rng.gen_bool(0.5) { '1' } else { '0' });
            }
            Value::String(literal)
        }
        BlockKind::Integer(b) => {
            let max = if b.bits == 64 {
                u64::MAX
            } else {
                (1u64 << b.bits) - 1
            };
            let raw = rng.gen_range(0..=max);
            number_from_i128(i128::from(raw) + i128::from(b.offset))
        }
        BlockKind::Float(b) => Value::from(rng.gen_range(b.lower..b.upper)),
        BlockKind::Pad { .. } => Value::Null,
        BlockKind::String(b) => {
            let s: String = (0..b.length)
                .map(|_| *ALNUM.choose(rng).unwrap_or(&b'A') as char)
                .collect();
            Value::String(s)
        }
        BlockKind::Steps(b) => {
            let first = b.steps[0];
            let last = b.steps[b.steps.len() - 1];
            Value::from(rng.gen_range(first - 1.0..last + 1.0))
        }
        BlockKind::Categories(b) => {
            let category = b
                .categories
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| "error".to_owned());
            Value::String(category)
        }
        BlockKind::Array(b) => {
            let count = if b.fixed {
                b.length
            } else {
                rng.gen_range(0..=b.length)
            };
            Value::Array((0..count).map(|_| random_value(&b.blocks, rng)).collect())
        }
        BlockKind::Object { blocklist } => {
            let mut obj = Map::new();
            for inner in blocklist {
                insert_random(&mut obj, inner, rng);
            }
            Value::Object(obj)
        }
    }
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
