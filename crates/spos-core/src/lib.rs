//! SPOS - Small Payload Object Serializer.
//!
//! A schema-driven codec for bandwidth-constrained links (LoRa,
//! satellite). A sender and a receiver share a *payload specification*, a
//! declarative JSON schema of typed blocks; SPOS encodes a payload object
//! into the shortest bit string consistent with that schema and decodes
//! it back, trading numeric precision for a fixed, predictable size.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use spos_core::{decode, encode, MessageFormat, PayloadSpec};
//!
//! let spec = PayloadSpec::compile(&json!({
//!     "name": "example payload",
//!     "version": 1,
//!     "body": [
//!         {"key": "constant_data", "type": "integer", "value": 2, "bits": 2},
//!         {"key": "int_data", "type": "integer", "bits": 6},
//!         {"key": "float_data", "type": "float", "bits": 6},
//!     ]
//! })).unwrap();
//!
//! let data = json!({"int_data": 13, "float_data": 0.6});
//! let message = encode(&data, &spec, MessageFormat::Bin).unwrap();
//! let decoded = decode(&message, &spec).unwrap();
//! assert_eq!(decoded.body["int_data"], json!(13));
//! ```

mod alphabet;
mod crc8;
mod error;
mod resolve;

pub mod block;
pub mod codec;
pub mod message;
pub mod spec;

pub use block::SpecError;
pub use codec::{DecodeError, EncodeError};
pub use error::SposError;
pub use message::{decode, decode_from_specs, encode, Decoded, Message, SpecsVersionError};
pub use spec::{HeaderBlock, Meta, PayloadSpec};
pub use spos_bits::MessageFormat;

pub use crc8::crc8;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn compile(raw: Value) -> PayloadSpec {
        PayloadSpec::compile(&raw).expect("spec compiles")
    }

    fn bin(message: &Message) -> &str {
        match message {
            Message::Bin(s) => s,
            other => panic!("expected bin message, got {other:?}"),
        }
    }

    #[test]
    fn readme_style_body() {
        let spec = compile(json!({
            "name": "example payload",
            "version": 1,
            "body": [
                {"key": "constant_data", "type": "integer", "value": 2, "bits": 2},
                {"key": "int_data", "type": "integer", "bits": 6},
                {"key": "float_data", "type": "float", "bits": 6},
            ]
        }));
        let data = json!({"int_data": 13, "float_data": 0.6});
        let message = encode(&data, &spec, MessageFormat::Bin).unwrap();
        // 0.6 scales to 37.8 over 63 levels and rounds to 38 (0b100110).
        assert_eq!(bin(&message), "0b10001101100110");

        let decoded = decode(&message, &spec).unwrap();
        assert_eq!(decoded.body["constant_data"], json!(2));
        assert_eq!(decoded.body["int_data"], json!(13));
        let float = decoded.body["float_data"].as_f64().unwrap();
        assert!((float - 0.6).abs() <= 1.0 / 63.0, "got {float}");
        assert_eq!(
            decoded.meta,
            json!({"name": "example payload", "version": 1})
        );
    }

    #[test]
    fn nested_key_lookup() {
        let spec = compile(json!({
            "name": "nested", "version": 1,
            "body": [{"key": "nested.value", "type": "integer", "bits": 8}]
        }));
        let data = json!({"nested": {"value": 255}});
        let message = encode(&data, &spec, MessageFormat::Bin).unwrap();
        assert_eq!(bin(&message), "0b11111111");
        let decoded = decode(&message, &spec).unwrap();
        assert_eq!(decoded.body, json!({"nested.value": 255}));
    }

    #[test]
    fn steps_bucket_names() {
        let spec = compile(json!({
            "name": "battery", "version": 1,
            "body": [{
                "key": "level", "type": "steps",
                "steps": [0.1, 0.6, 0.95],
                "steps_names": ["critical", "low", "discharging", "charged"]
            }]
        }));
        let message = encode(&json!({"level": 0.3}), &spec, MessageFormat::Bin).unwrap();
        // Three boundaries need 3 bits; 0.3 lands in bucket 1.
        assert_eq!(bin(&message), "0b001");
        let decoded = decode(&message, &spec).unwrap();
        assert_eq!(decoded.body["level"], json!("low"));
    }

    #[test]
    fn categories_error_mapping() {
        let spec = compile(json!({
            "name": "paint", "version": 1,
            "body": [{
                "key": "color", "type": "categories",
                "categories": ["red", "green", "blue", "iridescent"],
                "error": "unknown"
            }]
        }));
        let message = encode(&json!({"color": "brown"}), &spec, MessageFormat::Bin).unwrap();
        assert_eq!(bin(&message), "0b100");
        let decoded = decode(&message, &spec).unwrap();
        assert_eq!(decoded.body["color"], json!("unknown"));
    }

    #[test]
    fn version_and_crc_framing() {
        let spec = compile(json!({
            "name": "framed", "version": 1,
            "meta": {"encode_version": true, "version_bits": 4, "crc8": true},
            "body": []
        }));
        let message = encode(&json!({}), &spec, MessageFormat::Bin).unwrap();
        // 4 version bits, zero padding to one byte, then crc8(0x10) = 0x70.
        assert_eq!(bin(&message), "0b0001000001110000");
        let decoded = decode(&message, &spec).unwrap();
        assert_eq!(decoded.body, json!({}));
        assert_eq!(
            decoded.meta,
            json!({"name": "framed", "version": 1, "crc8": true})
        );
    }

    #[test]
    fn dynamic_array_prefix() {
        let spec = compile(json!({
            "name": "buffered", "version": 1,
            "body": [{
                "key": "buffer", "type": "array", "length": 4,
                "blocks": {"key": "item", "type": "integer", "bits": 4}
            }]
        }));
        let message = encode(&json!({"buffer": [1, 2, 3]}), &spec, MessageFormat::Bin).unwrap();
        assert_eq!(bin(&message), "0b011000100100011");
        let decoded = decode(&message, &spec).unwrap();
        assert_eq!(decoded.body["buffer"], json!([1, 2, 3]));
    }

    #[test]
    fn empty_dynamic_array() {
        let spec = compile(json!({
            "name": "buffered", "version": 1,
            "body": [{
                "key": "buffer", "type": "array", "length": 7,
                "blocks": {"key": "item", "type": "integer", "bits": 3}
            }]
        }));
        let message = encode(&json!({"buffer": []}), &spec, MessageFormat::Bin).unwrap();
        assert_eq!(bin(&message), "0b000");
        let decoded = decode(&message, &spec).unwrap();
        assert_eq!(decoded.body["buffer"], json!([]));
    }

    #[test]
    fn oversized_dynamic_array_is_an_error() {
        let spec = compile(json!({
            "name": "buffered", "version": 1,
            "body": [{
                "key": "buffer", "type": "array", "length": 2,
                "blocks": {"key": "item", "type": "integer", "bits": 3}
            }]
        }));
        let err = encode(&json!({"buffer": [1, 2, 3]}), &spec, MessageFormat::Bin).unwrap_err();
        assert!(matches!(
            err,
            SposError::Encode(EncodeError::TooManyElements { len: 3, max: 2, .. })
        ));
    }

    #[test]
    fn fixed_array_has_no_prefix() {
        let spec = compile(json!({
            "name": "fixed", "version": 1,
            "body": [{
                "key": "buffer", "type": "array", "length": 3, "fixed": true,
                "blocks": {"key": "item", "type": "integer", "bits": 4}
            }]
        }));
        let message = encode(&json!({"buffer": [1, 2, 3]}), &spec, MessageFormat::Bin).unwrap();
        assert_eq!(bin(&message), "0b000100100011");
        let err = encode(&json!({"buffer": [1, 2]}), &spec, MessageFormat::Bin).unwrap_err();
        assert!(matches!(
            err,
            SposError::Encode(EncodeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn alias_renames_on_decode() {
        let spec = compile(json!({
            "name": "aliased", "version": 1,
            "body": [{"key": "t", "type": "integer", "bits": 4, "alias": "temperature"}]
        }));
        let message = encode(&json!({"t": 9}), &spec, MessageFormat::Bin).unwrap();
        let decoded = decode(&message, &spec).unwrap();
        assert_eq!(decoded.body, json!({"temperature": 9}));
    }

    #[test]
    fn header_blocks_surface_in_meta() {
        let spec = compile(json!({
            "name": "sensor", "version": 3,
            "meta": {"header": [
                {"key": "station", "value": "rooftop"},
                {"key": "sensor_id", "type": "integer", "bits": 4}
            ]},
            "body": [{"key": "on", "type": "boolean"}]
        }));
        let message = encode(
            &json!({"sensor_id": 7, "on": true}),
            &spec,
            MessageFormat::Bin,
        )
        .unwrap();
        assert_eq!(bin(&message), "0b01111");
        let decoded = decode(&message, &spec).unwrap();
        assert_eq!(decoded.body, json!({"on": true}));
        assert_eq!(
            decoded.meta,
            json!({
                "name": "sensor", "version": 3,
                "header": {"station": "rooftop", "sensor_id": 7}
            })
        );
    }

    #[test]
    fn pad_bits_are_consumed_and_hidden() {
        let spec = compile(json!({
            "name": "padded", "version": 1,
            "body": [
                {"key": "pad", "type": "pad", "bits": 5},
                {"key": "on", "type": "boolean"}
            ]
        }));
        let message = encode(&json!({"on": true}), &spec, MessageFormat::Bin).unwrap();
        assert_eq!(bin(&message), "0b000001");
        let decoded = decode(&message, &spec).unwrap();
        assert_eq!(decoded.body, json!({"on": true}));
    }

    #[test]
    fn output_formats_agree() {
        let spec = compile(json!({
            "name": "fmt", "version": 1,
            "body": [{"key": "n", "type": "integer", "bits": 12}]
        }));
        let data = json!({"n": 0xabc});
        let bin_msg = encode(&data, &spec, MessageFormat::Bin).unwrap();
        let hex_msg = encode(&data, &spec, MessageFormat::Hex).unwrap();
        let bytes_msg = encode(&data, &spec, MessageFormat::Bytes).unwrap();
        assert_eq!(bin(&bin_msg), "0b101010111100");
        assert_eq!(hex_msg, Message::Hex("0xabc".to_owned()));
        assert_eq!(bytes_msg, Message::Bytes(vec![0xab, 0xc0]));
        for message in [bin_msg, hex_msg, bytes_msg] {
            let decoded = decode(&message, &spec).unwrap();
            assert_eq!(decoded.body["n"], json!(0xabc));
        }
    }

    #[test]
    fn truncated_message_is_an_error() {
        let spec = compile(json!({
            "name": "short", "version": 1,
            "body": [{"key": "n", "type": "integer", "bits": 8}]
        }));
        let err = decode(&Message::Bin("0b0101".to_owned()), &spec).unwrap_err();
        assert!(matches!(
            err,
            SposError::Decode(DecodeError::Bits(spos_bits::BitError::Truncated { .. }))
        ));
    }

    #[test]
    fn version_mismatch_is_an_error() {
        let spec = compile(json!({
            "name": "versioned", "version": 3,
            "meta": {"encode_version": true, "version_bits": 4},
            "body": [{"key": "on", "type": "boolean"}]
        }));
        let err = decode(&Message::Bin("0b00100".to_owned()), &spec).unwrap_err();
        assert!(matches!(
            err,
            SposError::Decode(DecodeError::VersionMismatch {
                expected: 3,
                found: 2
            })
        ));
    }
}
