//! Payload spec compilation.
//!
//! A raw JSON payload specification is validated once into a
//! [`PayloadSpec`]: the version header and CRC settings, the header
//! blocklist and the body blocklist, with every block fully typed and
//! every static value pre-encoded. Compiled specs are immutable and can
//! be shared freely across encode/decode calls.

use serde_json::{json, Map, Value};

use crate::block::{self, BlockDef, SpecError};

const SPEC_KEYS: &[&str] = &["name", "version", "meta", "body"];
const META_KEYS: &[&str] = &["encode_version", "version_bits", "crc8", "header"];

/// One header entry. Static headers carry a value but no wire bits.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderBlock {
    Static { key: String, value: Value },
    Coded(BlockDef),
}

impl HeaderBlock {
    fn output_name(&self) -> &str {
        match self {
            HeaderBlock::Static { key, .. } => key,
            HeaderBlock::Coded(block) => block.output_name(),
        }
    }
}

/// Compiled meta options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Meta {
    pub encode_version: bool,
    /// Width of the version prefix; meaningful when `encode_version`.
    pub version_bits: u32,
    pub crc8: bool,
    pub header: Vec<HeaderBlock>,
}

/// A compiled payload specification. Identity is `(name, version)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadSpec {
    pub name: String,
    pub version: u64,
    pub meta: Meta,
    pub body: Vec<BlockDef>,
}

impl PayloadSpec {
    /// Validates and compiles a raw JSON payload specification.
    pub fn compile(raw: &Value) -> Result<PayloadSpec, SpecError> {
        let obj = raw.as_object().ok_or_else(|| SpecError::NotAnObject {
            context: "payload spec".to_owned(),
        })?;
        for key in obj.keys() {
            if !SPEC_KEYS.contains(&key.as_str()) {
                return Err(SpecError::UnexpectedKey {
                    context: "payload spec".to_owned(),
                    key: key.clone(),
                });
            }
        }

        let name = obj
            .get("name")
            .ok_or_else(|| SpecError::MissingKey {
                context: "payload spec".to_owned(),
                key: "name",
            })?
            .as_str()
            .ok_or_else(|| SpecError::WrongType {
                context: "payload spec".to_owned(),
                key: "name".to_owned(),
                expected: "a string",
            })?
            .to_owned();
        let version = obj
            .get("version")
            .ok_or_else(|| SpecError::MissingKey {
                context: "payload spec".to_owned(),
                key: "version",
            })?
            .as_u64()
            .ok_or_else(|| SpecError::WrongType {
                context: "payload spec".to_owned(),
                key: "version".to_owned(),
                expected: "a non-negative integer",
            })?;

        let meta = match obj.get("meta") {
            None => Meta::default(),
            Some(raw_meta) => compile_meta(raw_meta, version)?,
        };

        let raw_body = obj
            .get("body")
            .ok_or_else(|| SpecError::MissingKey {
                context: "payload spec".to_owned(),
                key: "body",
            })?
            .as_array()
            .ok_or_else(|| SpecError::WrongType {
                context: "payload spec".to_owned(),
                key: "body".to_owned(),
                expected: "an array of blocks",
            })?;
        let body = raw_body
            .iter()
            .map(block::build_block)
            .collect::<Result<Vec<_>, _>>()?;
        block::check_unique_names(&body)?;

        Ok(PayloadSpec {
            name,
            version,
            meta,
            body,
        })
    }

    /// Header blocks that occupy wire bits.
    pub fn coded_header(&self) -> impl Iterator<Item = &BlockDef> {
        self.meta.header.iter().filter_map(|h| match h {
            HeaderBlock::Coded(block) => Some(block),
            HeaderBlock::Static { .. } => None,
        })
    }

    /// Upper bound on the message width in bits, before the CRC trailer's
    /// byte padding.
    pub fn max_body_bits(&self) -> u64 {
        let version = if self.meta.encode_version {
            u64::from(self.meta.version_bits)
        } else {
            0
        };
        let header: u64 = self.coded_header().map(BlockDef::max_width).sum();
        let body: u64 = self.body.iter().map(BlockDef::max_width).sum();
        version + header + body
    }

    /// Spec statistics: identity plus the bit budget per block (maximum
    /// widths for dynamic blocks) and the total message size.
    pub fn stats(&self) -> Value {
        let mut blocks = Map::new();
        for block in self.coded_header() {
            blocks.insert(block.key.clone(), json!(block.max_width()));
        }
        for block in &self.body {
            blocks.insert(block.key.clone(), json!(block.max_width()));
        }
        let payload = self.max_body_bits();
        let total = if self.meta.crc8 {
            payload.div_ceil(8) * 8 + 8
        } else {
            payload
        };
        let mut stats = Map::new();
        stats.insert("name".to_owned(), json!(self.name));
        stats.insert("version".to_owned(), json!(self.version));
        if self.meta.encode_version {
            stats.insert("version_bits".to_owned(), json!(self.meta.version_bits));
        }
        if self.meta.crc8 {
            stats.insert("crc8_bits".to_owned(), json!(8));
        }
        stats.insert("blocks".to_owned(), Value::Object(blocks));
        stats.insert("max_bits".to_owned(), json!(total));
        Value::Object(stats)
    }
}

fn compile_meta(raw: &Value, version: u64) -> Result<Meta, SpecError> {
    let obj = raw.as_object().ok_or_else(|| SpecError::WrongType {
        context: "payload spec".to_owned(),
        key: "meta".to_owned(),
        expected: "an object",
    })?;
    for key in obj.keys() {
        if !META_KEYS.contains(&key.as_str()) {
            return Err(SpecError::UnexpectedKey {
                context: "meta".to_owned(),
                key: key.clone(),
            });
        }
    }

    let encode_version = optional_bool(obj, "encode_version")?;
    let crc8 = optional_bool(obj, "crc8")?;

    let version_bits = match (encode_version, obj.get("version_bits")) {
        (false, None) => 0,
        (false, Some(_)) => {
            return Err(SpecError::UnexpectedKey {
                context: "meta".to_owned(),
                key: "version_bits".to_owned(),
            })
        }
        (true, None) => {
            return Err(SpecError::MissingKey {
                context: "meta".to_owned(),
                key: "version_bits",
            })
        }
        (true, Some(raw_bits)) => {
            let bits = raw_bits
                .as_u64()
                .filter(|&b| (1..=64).contains(&b))
                .ok_or_else(|| SpecError::WrongType {
                    context: "meta".to_owned(),
                    key: "version_bits".to_owned(),
                    expected: "an integer in 1..=64",
                })? as u32;
            if bits < 64 && version >= 1 << bits {
                return Err(SpecError::VersionOverflow { version, bits });
            }
            bits
        }
    };

    let header = match obj.get("header") {
        None => Vec::new(),
        Some(raw_header) => compile_header(raw_header)?,
    };

    Ok(Meta {
        encode_version,
        version_bits,
        crc8,
        header,
    })
}

fn compile_header(raw: &Value) -> Result<Vec<HeaderBlock>, SpecError> {
    let list = raw.as_array().ok_or_else(|| SpecError::WrongType {
        context: "meta".to_owned(),
        key: "header".to_owned(),
        expected: "an array of blocks",
    })?;
    let mut header = Vec::with_capacity(list.len());
    for raw_block in list {
        header.push(compile_header_block(raw_block)?);
    }
    for (i, block) in header.iter().enumerate() {
        let name = block.output_name();
        if header[..i].iter().any(|b| b.output_name() == name) {
            return Err(SpecError::DuplicateBlockKey {
                name: name.to_owned(),
            });
        }
    }
    Ok(header)
}

fn compile_header_block(raw: &Value) -> Result<HeaderBlock, SpecError> {
    let obj = raw.as_object().ok_or_else(|| SpecError::NotAnObject {
        context: "header block".to_owned(),
    })?;
    if obj.contains_key("type") {
        return Ok(HeaderBlock::Coded(block::build_block(raw)?));
    }
    // Static header: a known value, no wire bits.
    let key = obj
        .get("key")
        .ok_or_else(|| SpecError::MissingKey {
            context: "header block".to_owned(),
            key: "key",
        })?
        .as_str()
        .ok_or_else(|| SpecError::WrongType {
            context: "header block".to_owned(),
            key: "key".to_owned(),
            expected: "a string",
        })?
        .to_owned();
    let value = obj
        .get("value")
        .ok_or_else(|| SpecError::MissingKey {
            context: format!("header block `{key}`"),
            key: "value",
        })?
        .clone();
    for present in obj.keys() {
        if !["key", "value"].contains(&present.as_str()) {
            return Err(SpecError::UnexpectedKey {
                context: format!("header block `{key}`"),
                key: present.clone(),
            });
        }
    }
    Ok(HeaderBlock::Static { key, value })
}

fn optional_bool(obj: &Map<String, Value>, key: &str) -> Result<bool, SpecError> {
    match obj.get(key) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(SpecError::WrongType {
            context: "meta".to_owned(),
            key: key.to_owned(),
            expected: "a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_spec() {
        let spec = PayloadSpec::compile(&json!({
            "name": "test", "version": 1,
            "body": [{"key": "flag", "type": "boolean"}]
        }))
        .unwrap();
        assert_eq!(spec.name, "test");
        assert_eq!(spec.version, 1);
        assert!(!spec.meta.encode_version);
        assert!(!spec.meta.crc8);
        assert_eq!(spec.body.len(), 1);
        assert_eq!(spec.max_body_bits(), 1);
    }

    #[test]
    fn missing_top_level_keys() {
        for broken in [
            json!({"version": 1, "body": []}),
            json!({"name": "x", "body": []}),
            json!({"name": "x", "version": 1}),
        ] {
            assert!(matches!(
                PayloadSpec::compile(&broken),
                Err(SpecError::MissingKey { .. })
            ));
        }
    }

    #[test]
    fn unexpected_top_level_key() {
        let err = PayloadSpec::compile(&json!({
            "name": "x", "version": 1, "body": [], "extra": "key"
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::UnexpectedKey { .. }));
    }

    #[test]
    fn meta_must_be_object() {
        let err = PayloadSpec::compile(&json!({
            "name": "x", "version": 1, "meta": "error", "body": []
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::WrongType { .. }));
    }

    #[test]
    fn encode_version_requires_bits() {
        let err = PayloadSpec::compile(&json!({
            "name": "x", "version": 1,
            "meta": {"encode_version": true}, "body": []
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            SpecError::MissingKey {
                key: "version_bits",
                ..
            }
        ));
    }

    #[test]
    fn version_must_fit() {
        let err = PayloadSpec::compile(&json!({
            "name": "x", "version": 17,
            "meta": {"encode_version": true, "version_bits": 4}, "body": []
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            SpecError::VersionOverflow { version: 17, bits: 4 }
        ));
        assert!(PayloadSpec::compile(&json!({
            "name": "x", "version": 15,
            "meta": {"encode_version": true, "version_bits": 4}, "body": []
        }))
        .is_ok());
    }

    #[test]
    fn static_header_keys_checked() {
        let err = PayloadSpec::compile(&json!({
            "name": "x", "version": 1,
            "meta": {"header": [{"value": "hello!"}]}, "body": []
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::MissingKey { key: "key", .. }));

        let err = PayloadSpec::compile(&json!({
            "name": "x", "version": 1,
            "meta": {"header": [{"key": "my key", "value": "hello!", "error key": 1}]},
            "body": []
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::UnexpectedKey { .. }));
    }

    #[test]
    fn header_name_collision_rejected() {
        let err = PayloadSpec::compile(&json!({
            "name": "x", "version": 1,
            "meta": {"header": [
                {"key": "key1", "type": "string", "length": 6},
                {"key": "key1", "type": "integer", "bits": 12}
            ]},
            "body": []
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::DuplicateBlockKey { .. }));
    }

    #[test]
    fn duplicate_body_keys_rejected() {
        let err = PayloadSpec::compile(&json!({
            "name": "x", "version": 1,
            "body": [
                {"key": "jon", "type": "boolean"},
                {"key": "jon", "type": "binary", "bits": 10}
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::DuplicateBlockKey { .. }));
    }

    #[test]
    fn stats_totals() {
        let spec = PayloadSpec::compile(&json!({
            "name": "x", "version": 1,
            "meta": {"encode_version": true, "version_bits": 4, "crc8": true},
            "body": [{"key": "n", "type": "integer", "bits": 6}]
        }))
        .unwrap();
        let stats = spec.stats();
        assert_eq!(stats["name"], json!("x"));
        assert_eq!(stats["blocks"]["n"], json!(6));
        // 4 + 6 = 10 payload bits, padded to 16, plus the CRC byte.
        assert_eq!(stats["max_bits"], json!(24));
    }
}
