//! Raw block description validation.
//!
//! Turns free-form JSON block descriptions into typed [`BlockDef`]s:
//! required/forbidden keys per type, default substitution, recursive
//! resolution of nested blocks, and pre-encoding of static values.

use serde_json::{Map, Value};

use super::error::SpecError;
use super::types::{
    Approximation, ArrayBlock, BlockDef, BlockKind, CategoriesBlock, FloatBlock, IntegerBlock,
    IntegerMode, StaticCache, StepsBlock, StringBlock,
};
use super::width_for_codes;
use crate::codec;

const COMMON_KEYS: &[&str] = &["key", "type", "alias", "value"];

/// Validates one raw block description into a [`BlockDef`].
pub fn build_block(raw: &Value) -> Result<BlockDef, SpecError> {
    let obj = raw.as_object().ok_or_else(|| SpecError::NotAnObject {
        context: "block".to_owned(),
    })?;
    let key = require_str(obj, "block", "key")?.to_owned();
    let ctx = format!("block `{key}`");
    let type_name = require_str(obj, &ctx, "type")?;

    let (kind, type_keys): (BlockKind, &[&str]) = match type_name {
        "boolean" => (BlockKind::Boolean, &[]),
        "binary" => (
            BlockKind::Binary {
                bits: require_width(obj, &key, &ctx)?,
            },
            &["bits"],
        ),
        "integer" => (
            BlockKind::Integer(build_integer(obj, &key, &ctx)?),
            &["bits", "offset", "mode"],
        ),
        "float" => (
            BlockKind::Float(build_float(obj, &key, &ctx)?),
            &["bits", "lower", "upper", "approximation"],
        ),
        "pad" => {
            if obj.contains_key("value") {
                return Err(SpecError::UnexpectedKey {
                    context: ctx,
                    key: "value".to_owned(),
                });
            }
            (
                BlockKind::Pad {
                    bits: require_width(obj, &key, &ctx)?,
                },
                &["bits"],
            )
        }
        "string" => (
            BlockKind::String(build_string(obj, &ctx)?),
            &["length", "custom_alphabeth"],
        ),
        "steps" => (
            BlockKind::Steps(build_steps(obj, &key, &ctx)?),
            &["steps", "steps_names"],
        ),
        "categories" => (
            BlockKind::Categories(build_categories(obj, &key, &ctx)?),
            &["categories", "error"],
        ),
        "array" => (
            BlockKind::Array(build_array(obj, &ctx)?),
            &["length", "fixed", "blocks"],
        ),
        "object" => (
            BlockKind::Object {
                blocklist: build_blocklist(obj, &ctx)?,
            },
            &["blocklist"],
        ),
        other => {
            return Err(SpecError::UnknownBlockType {
                key,
                type_name: other.to_owned(),
            })
        }
    };

    for present in obj.keys() {
        if !COMMON_KEYS.contains(&present.as_str()) && !type_keys.contains(&present.as_str()) {
            return Err(SpecError::UnexpectedKey {
                context: ctx,
                key: present.clone(),
            });
        }
    }

    let alias = match obj.get("alias") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(SpecError::WrongType {
                context: ctx,
                key: "alias".to_owned(),
                expected: "a string",
            })
        }
    };

    let mut block = BlockDef {
        key,
        alias,
        kind,
        static_cache: None,
    };
    if let Some(value) = obj.get("value") {
        block.static_cache = Some(build_static_cache(&block, value)?);
    }
    Ok(block)
}

fn build_static_cache(block: &BlockDef, value: &Value) -> Result<StaticCache, SpecError> {
    let bits = codec::encode_static(block, value).map_err(|source| SpecError::StaticValue {
        key: block.key.clone(),
        source: Box::new(source),
    })?;
    // The projection always decodes: it reads exactly the bits just written.
    let projected = codec::decode_static(block, &bits).unwrap_or(Value::Null);
    Ok(StaticCache { bits, projected })
}

fn build_integer(obj: &Map<String, Value>, key: &str, ctx: &str) -> Result<IntegerBlock, SpecError> {
    let bits = require_width(obj, key, ctx)?;
    let offset = match obj.get("offset") {
        None => 0,
        Some(v) => as_int(v).ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: "offset".to_owned(),
            expected: "an integer",
        })?,
    };
    let mode = match obj.get("mode") {
        None => IntegerMode::Truncate,
        Some(Value::String(s)) if s == "truncate" => IntegerMode::Truncate,
        Some(Value::String(s)) if s == "remainder" => IntegerMode::Remainder,
        Some(_) => {
            return Err(SpecError::WrongType {
                context: ctx.to_owned(),
                key: "mode".to_owned(),
                expected: "`truncate` or `remainder`",
            })
        }
    };
    Ok(IntegerBlock { bits, offset, mode })
}

fn build_float(obj: &Map<String, Value>, key: &str, ctx: &str) -> Result<FloatBlock, SpecError> {
    let bits = require_width(obj, key, ctx)?;
    let lower = optional_number(obj, ctx, "lower", 0.0)?;
    let upper = optional_number(obj, ctx, "upper", 1.0)?;
    if !(upper > lower) {
        return Err(SpecError::WrongType {
            context: ctx.to_owned(),
            key: "upper".to_owned(),
            expected: "greater than `lower`",
        });
    }
    let approximation = match obj.get("approximation") {
        None => Approximation::Round,
        Some(Value::String(s)) if s == "round" => Approximation::Round,
        Some(Value::String(s)) if s == "floor" => Approximation::Floor,
        Some(Value::String(s)) if s == "ceil" => Approximation::Ceil,
        Some(_) => {
            return Err(SpecError::WrongType {
                context: ctx.to_owned(),
                key: "approximation".to_owned(),
                expected: "`round`, `floor` or `ceil`",
            })
        }
    };
    Ok(FloatBlock {
        bits,
        lower,
        upper,
        approximation,
    })
}

fn build_string(obj: &Map<String, Value>, ctx: &str) -> Result<StringBlock, SpecError> {
    let length = obj
        .get("length")
        .ok_or_else(|| SpecError::MissingKey {
            context: ctx.to_owned(),
            key: "length",
        })?
        .as_u64()
        .filter(|&n| n >= 1)
        .ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: "length".to_owned(),
            expected: "a positive integer",
        })? as usize;

    let mut custom_alphabeth = Vec::new();
    if let Some(raw) = obj.get("custom_alphabeth") {
        let map = raw.as_object().ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: "custom_alphabeth".to_owned(),
            expected: "an object of index to character",
        })?;
        for (index_key, ch_value) in map {
            let index: u8 = index_key
                .parse()
                .ok()
                .filter(|&i| i < 64)
                .ok_or_else(|| SpecError::WrongType {
                    context: ctx.to_owned(),
                    key: "custom_alphabeth".to_owned(),
                    expected: "indexes in 0..=63",
                })?;
            let ch = ch_value
                .as_str()
                .and_then(|s| {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(c),
                        _ => None,
                    }
                })
                .ok_or_else(|| SpecError::WrongType {
                    context: ctx.to_owned(),
                    key: "custom_alphabeth".to_owned(),
                    expected: "single-character values",
                })?;
            custom_alphabeth.push((index, ch));
        }
    }
    Ok(StringBlock {
        length,
        custom_alphabeth,
    })
}

fn build_steps(obj: &Map<String, Value>, key: &str, ctx: &str) -> Result<StepsBlock, SpecError> {
    let raw_steps = obj
        .get("steps")
        .ok_or_else(|| SpecError::MissingKey {
            context: ctx.to_owned(),
            key: "steps",
        })?
        .as_array()
        .ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: "steps".to_owned(),
            expected: "an array of numbers",
        })?;
    if raw_steps.is_empty() {
        return Err(SpecError::EmptyList {
            key: key.to_owned(),
            what: "steps",
        });
    }
    let mut steps = Vec::with_capacity(raw_steps.len());
    for v in raw_steps {
        steps.push(v.as_f64().ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: "steps".to_owned(),
            expected: "an array of numbers",
        })?);
    }
    if steps.windows(2).any(|w| w[0] >= w[1]) {
        return Err(SpecError::StepsNotAscending {
            key: key.to_owned(),
        });
    }

    let names = match obj.get("steps_names") {
        Some(raw) => {
            let list = raw.as_array().ok_or_else(|| SpecError::WrongType {
                context: ctx.to_owned(),
                key: "steps_names".to_owned(),
                expected: "an array of strings",
            })?;
            if list.len() != steps.len() + 1 {
                return Err(SpecError::StepsNamesLength {
                    key: key.to_owned(),
                    expected: steps.len() + 1,
                });
            }
            list.iter()
                .map(|v| {
                    v.as_str().map(str::to_owned).ok_or_else(|| SpecError::WrongType {
                        context: ctx.to_owned(),
                        key: "steps_names".to_owned(),
                        expected: "an array of strings",
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        None => synthesise_step_names(&steps),
    };

    let bits = width_for_codes(steps.len() as u64 + 2);
    Ok(StepsBlock { steps, names, bits })
}

fn synthesise_step_names(steps: &[f64]) -> Vec<String> {
    let mut names = Vec::with_capacity(steps.len() + 1);
    names.push(format!("x<{}", steps[0]));
    for pair in steps.windows(2) {
        names.push(format!("{}<=x<{}", pair[0], pair[1]));
    }
    names.push(format!("x>={}", steps[steps.len() - 1]));
    names
}

fn build_categories(
    obj: &Map<String, Value>,
    key: &str,
    ctx: &str,
) -> Result<CategoriesBlock, SpecError> {
    let raw = obj
        .get("categories")
        .ok_or_else(|| SpecError::MissingKey {
            context: ctx.to_owned(),
            key: "categories",
        })?
        .as_array()
        .ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: "categories".to_owned(),
            expected: "an array of strings",
        })?;
    if raw.is_empty() {
        return Err(SpecError::EmptyList {
            key: key.to_owned(),
            what: "categories",
        });
    }
    let mut categories = Vec::with_capacity(raw.len());
    for v in raw {
        let s = v.as_str().ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: "categories".to_owned(),
            expected: "an array of strings",
        })?;
        if categories.iter().any(|c| c == s) {
            return Err(SpecError::DuplicateCategory {
                key: key.to_owned(),
                category: s.to_owned(),
            });
        }
        categories.push(s.to_owned());
    }
    let error = match obj.get("error") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(SpecError::WrongType {
                context: ctx.to_owned(),
                key: "error".to_owned(),
                expected: "a string",
            })
        }
    };
    let bits = width_for_codes(categories.len() as u64 + 2);
    Ok(CategoriesBlock {
        categories,
        error,
        bits,
    })
}

fn build_array(obj: &Map<String, Value>, ctx: &str) -> Result<ArrayBlock, SpecError> {
    let length = obj
        .get("length")
        .ok_or_else(|| SpecError::MissingKey {
            context: ctx.to_owned(),
            key: "length",
        })?
        .as_u64()
        .filter(|&n| n >= 1)
        .ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: "length".to_owned(),
            expected: "a positive integer",
        })? as usize;
    let fixed = match obj.get("fixed") {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(SpecError::WrongType {
                context: ctx.to_owned(),
                key: "fixed".to_owned(),
                expected: "a boolean",
            })
        }
    };
    let inner = obj.get("blocks").ok_or_else(|| SpecError::MissingKey {
        context: ctx.to_owned(),
        key: "blocks",
    })?;
    Ok(ArrayBlock::new(length, fixed, build_block(inner)?))
}

fn build_blocklist(obj: &Map<String, Value>, ctx: &str) -> Result<Vec<BlockDef>, SpecError> {
    let raw = obj
        .get("blocklist")
        .ok_or_else(|| SpecError::MissingKey {
            context: ctx.to_owned(),
            key: "blocklist",
        })?
        .as_array()
        .ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: "blocklist".to_owned(),
            expected: "an array of blocks",
        })?;
    let blocks = raw.iter().map(build_block).collect::<Result<Vec<_>, _>>()?;
    check_unique_names(&blocks)?;
    Ok(blocks)
}

/// Rejects duplicate output names (key or alias) within one blocklist.
pub(crate) fn check_unique_names(blocks: &[BlockDef]) -> Result<(), SpecError> {
    for (i, block) in blocks.iter().enumerate() {
        let name = block.output_name();
        if blocks[..i].iter().any(|b| b.output_name() == name) {
            return Err(SpecError::DuplicateBlockKey {
                name: name.to_owned(),
            });
        }
    }
    Ok(())
}

fn require_str<'a>(
    obj: &'a Map<String, Value>,
    ctx: &str,
    key: &'static str,
) -> Result<&'a str, SpecError> {
    obj.get(key)
        .ok_or_else(|| SpecError::MissingKey {
            context: ctx.to_owned(),
            key,
        })?
        .as_str()
        .ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: key.to_owned(),
            expected: "a string",
        })
}

fn require_width(obj: &Map<String, Value>, key: &str, ctx: &str) -> Result<u32, SpecError> {
    let raw = obj.get("bits").ok_or_else(|| SpecError::MissingKey {
        context: ctx.to_owned(),
        key: "bits",
    })?;
    let bits = as_int(raw).ok_or_else(|| SpecError::WrongType {
        context: ctx.to_owned(),
        key: "bits".to_owned(),
        expected: "an integer",
    })?;
    if !(1..=64).contains(&bits) {
        return Err(SpecError::BadWidth {
            key: key.to_owned(),
            bits,
        });
    }
    Ok(bits as u32)
}

fn optional_number(
    obj: &Map<String, Value>,
    ctx: &str,
    key: &str,
    default: f64,
) -> Result<f64, SpecError> {
    match obj.get(key) {
        None => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| SpecError::WrongType {
            context: ctx.to_owned(),
            key: key.to_owned(),
            expected: "a number",
        }),
    }
}

fn as_int(value: &Value) -> Option<i64> {
    let n = match value {
        Value::Number(n) => n,
        _ => return None,
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.is_finite() => Some(f as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boolean_block() {
        let block = build_block(&json!({"key": "flag", "type": "boolean"})).unwrap();
        assert_eq!(block.key, "flag");
        assert_eq!(block.kind, BlockKind::Boolean);
        assert_eq!(block.max_width(), 1);
    }

    #[test]
    fn missing_key_rejected() {
        let err = build_block(&json!({"type": "boolean"})).unwrap_err();
        assert!(matches!(err, SpecError::MissingKey { key: "key", .. }));
    }

    #[test]
    fn unknown_type_rejected() {
        let err = build_block(&json!({"key": "x", "type": "quaternion"})).unwrap_err();
        assert!(matches!(err, SpecError::UnknownBlockType { .. }));
    }

    #[test]
    fn unexpected_key_rejected() {
        let err =
            build_block(&json!({"key": "x", "type": "boolean", "bits": 3})).unwrap_err();
        assert!(matches!(err, SpecError::UnexpectedKey { .. }));
    }

    #[test]
    fn width_bounds() {
        for bits in [0, -1, 65] {
            let err =
                build_block(&json!({"key": "x", "type": "integer", "bits": bits})).unwrap_err();
            assert!(matches!(err, SpecError::BadWidth { .. }), "bits={bits}");
        }
        assert!(build_block(&json!({"key": "x", "type": "integer", "bits": 64})).is_ok());
    }

    #[test]
    fn steps_must_ascend() {
        let err = build_block(&json!({
            "key": "x", "type": "steps", "steps": [1, 1, 2]
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::StepsNotAscending { .. }));
    }

    #[test]
    fn steps_widths_reserve_error_code() {
        let block = build_block(&json!({
            "key": "x", "type": "steps", "steps": [0.1, 0.6, 0.95]
        }))
        .unwrap();
        // Four buckets plus the reserved code: 3 bits.
        assert_eq!(block.max_width(), 3);
    }

    #[test]
    fn steps_names_synthesised() {
        let block = build_block(&json!({
            "key": "x", "type": "steps", "steps": [0, 5, 10]
        }))
        .unwrap();
        match block.kind {
            BlockKind::Steps(b) => {
                assert_eq!(b.names, vec!["x<0", "0<=x<5", "5<=x<10", "x>=10"]);
            }
            other => panic!("expected steps, got {other:?}"),
        }
    }

    #[test]
    fn steps_names_length_enforced() {
        let err = build_block(&json!({
            "key": "x", "type": "steps", "steps": [0, 5, 10],
            "steps_names": ["one", "two"]
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::StepsNamesLength { expected: 4, .. }));
    }

    #[test]
    fn categories_unique_and_wide_enough() {
        let block = build_block(&json!({
            "key": "x", "type": "categories",
            "categories": ["red", "green", "blue", "iridescent"],
            "error": "unknown"
        }))
        .unwrap();
        // Four categories, the error slot and the reserved code: 3 bits.
        assert_eq!(block.max_width(), 3);

        let err = build_block(&json!({
            "key": "x", "type": "categories", "categories": ["red", "red"]
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::DuplicateCategory { .. }));
    }

    #[test]
    fn array_prefix_width() {
        let block = build_block(&json!({
            "key": "x", "type": "array", "length": 4,
            "blocks": {"key": "item", "type": "integer", "bits": 4}
        }))
        .unwrap();
        match &block.kind {
            BlockKind::Array(b) => {
                assert!(!b.fixed);
                assert_eq!(b.prefix_bits, 3);
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn pad_rejects_static_value() {
        let err = build_block(&json!({
            "key": "x", "type": "pad", "bits": 3, "value": 1
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::UnexpectedKey { .. }));
    }

    #[test]
    fn static_value_is_cached() {
        let block = build_block(&json!({
            "key": "x", "type": "integer", "bits": 6, "value": 13
        }))
        .unwrap();
        let cache = block.static_cache.expect("cache");
        assert_eq!(cache.bits.to_bin_literal(), "0b001101");
        assert_eq!(cache.projected, json!(13));
    }

    #[test]
    fn static_value_must_encode() {
        let err = build_block(&json!({
            "key": "x", "type": "integer", "bits": 6, "value": "thirteen"
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::StaticValue { .. }));
    }

    #[test]
    fn duplicate_names_in_object_rejected() {
        let err = build_block(&json!({
            "key": "o", "type": "object", "blocklist": [
                {"key": "a", "type": "boolean"},
                {"key": "b", "type": "boolean", "alias": "a"}
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::DuplicateBlockKey { .. }));
    }
}
