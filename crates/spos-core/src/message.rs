//! Message assembly and disassembly.
//!
//! Drives a compiled spec across the bit stream: version prefix, header
//! blocks, body blocks, CRC-8 trailer. The decoder mirrors the encoder
//! exactly, verifying the CRC before touching any block and the version
//! prefix before the header.

use serde_json::{Map, Value};
use spos_bits::{BitReader, BitWriter, Bits, MessageFormat};
use thiserror::Error;

use crate::codec::{self, DecodeError, EncodeError};
use crate::crc8::crc8;
use crate::error::SposError;
use crate::spec::{HeaderBlock, PayloadSpec};

/// An encoded message in one of the external representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// `"0b…"` literal.
    Bin(String),
    /// `"0x…"` literal.
    Hex(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Message {
    pub fn format(&self) -> MessageFormat {
        match self {
            Message::Bin(_) => MessageFormat::Bin,
            Message::Hex(_) => MessageFormat::Hex,
            Message::Bytes(_) => MessageFormat::Bytes,
        }
    }

    /// Renders a bit string in the requested representation.
    pub fn from_bits(bits: &Bits, format: MessageFormat) -> Message {
        match format {
            MessageFormat::Bin => Message::Bin(bits.to_bin_literal()),
            MessageFormat::Hex => Message::Hex(bits.to_hex_literal()),
            MessageFormat::Bytes => Message::Bytes(bits.to_bytes()),
        }
    }

    /// Normalises to the internal bit stream.
    pub fn to_bits(&self) -> Result<Bits, DecodeError> {
        let bits = match self {
            Message::Bin(s) => Bits::from_bin_literal(s)?,
            Message::Hex(s) => Bits::from_hex_literal(s)?,
            Message::Bytes(b) => Bits::from_bytes(b),
        };
        Ok(bits)
    }

    /// Interprets message text by its prefix: `0x…` is hex, `0b…` is
    /// binary.
    pub fn parse_text(s: &str) -> Result<Message, DecodeError> {
        let trimmed = s.trim();
        if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
            Ok(Message::Hex(trimmed.to_owned()))
        } else if trimmed.starts_with("0b") {
            Ok(Message::Bin(trimmed.to_owned()))
        } else {
            Err(DecodeError::Bits(spos_bits::BitError::BadLiteral(format!(
                "expected a 0b or 0x message literal, got `{trimmed}`"
            ))))
        }
    }
}

/// Result of decoding: the reconstructed body and the message metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub body: Value,
    pub meta: Value,
}

/// Raised when the spec pool handed to [`decode_from_specs`] is not a
/// coherent version family.
#[derive(Debug, Error)]
pub enum SpecsVersionError {
    #[error("spec pool is empty")]
    Empty,
    #[error("spec pool mixes names `{expected}` and `{found}`")]
    NameMismatch { expected: String, found: String },
    #[error("spec `{name}` version {version} does not encode its version")]
    VersionNotEncoded { name: String, version: u64 },
    #[error("spec pool mixes different `version_bits`")]
    VersionBitsMismatch,
    #[error("spec pool has version {version} more than once")]
    DuplicateVersion { version: u64 },
}

/// Encodes `payload_data` under `spec` into the requested representation.
pub fn encode(
    payload_data: &Value,
    spec: &PayloadSpec,
    format: MessageFormat,
) -> Result<Message, SposError> {
    if !payload_data.is_object() {
        return Err(EncodeError::NotAnObject.into());
    }
    let mut writer = BitWriter::new();
    if spec.meta.encode_version {
        writer.append(spec.version, spec.meta.version_bits);
    }
    for header in &spec.meta.header {
        if let HeaderBlock::Coded(block) = header {
            codec::encode_blocklist(std::slice::from_ref(block), payload_data, &mut writer)?;
        }
    }
    codec::encode_blocklist(&spec.body, payload_data, &mut writer)?;
    if spec.meta.crc8 {
        writer.pad_to_byte();
        let crc = crc8(&writer.as_bits().to_bytes());
        writer.append(u64::from(crc), 8);
    }
    Ok(Message::from_bits(&writer.finish(), format))
}

/// Decodes `message` under `spec`, returning body and meta.
pub fn decode(message: &Message, spec: &PayloadSpec) -> Result<Decoded, SposError> {
    let bits = message.to_bits().map_err(SposError::Decode)?;
    let payload = if spec.meta.crc8 {
        check_crc(&bits)?
    } else {
        bits
    };

    let mut reader = BitReader::new(&payload);
    if spec.meta.encode_version {
        let found = reader.read(spec.meta.version_bits).map_err(DecodeError::from)?;
        if found != spec.version {
            return Err(DecodeError::VersionMismatch {
                expected: spec.version,
                found,
            }
            .into());
        }
    }

    let mut header_out = Map::new();
    for header in &spec.meta.header {
        match header {
            HeaderBlock::Static { key, value } => {
                header_out.insert(key.clone(), value.clone());
            }
            HeaderBlock::Coded(block) => {
                if let Some(value) = codec::decode_block(block, &mut reader)? {
                    header_out.insert(block.output_name().to_owned(), value);
                }
            }
        }
    }
    let body = codec::decode_blocklist(&spec.body, &mut reader)?;

    let mut meta = Map::new();
    meta.insert("name".to_owned(), Value::String(spec.name.clone()));
    meta.insert("version".to_owned(), Value::from(spec.version));
    if spec.meta.crc8 {
        meta.insert("crc8".to_owned(), Value::Bool(true));
    }
    if !header_out.is_empty() {
        meta.insert("header".to_owned(), Value::Object(header_out));
    }

    Ok(Decoded {
        body: Value::Object(body),
        meta: Value::Object(meta),
    })
}

/// Splits off the trailing CRC byte and verifies it over the rest.
fn check_crc(bits: &Bits) -> Result<Bits, DecodeError> {
    if bits.len() % 8 != 0 {
        return Err(DecodeError::NotByteAligned { bits: bits.len() });
    }
    if bits.len() < 8 {
        return Err(DecodeError::Bits(spos_bits::BitError::Truncated {
            needed: 8,
            offset: 0,
            available: bits.len(),
        }));
    }
    let bytes = bits.to_bytes();
    let (payload_bytes, trailer) = bytes.split_at(bytes.len() - 1);
    let computed = crc8(payload_bytes);
    let received = trailer[0];
    if computed != received {
        return Err(DecodeError::CrcMismatch { computed, received });
    }
    Ok(bits.prefix(bits.len() - 8))
}

/// Decodes `message` against a pool of spec versions.
///
/// All specs must share a name, encode their version with the same
/// `version_bits`, and carry pairwise distinct versions. The version
/// prefix is peeked, the matching spec selected, and `decode` does the
/// rest (the prefix is not consumed by the peek).
pub fn decode_from_specs(message: &Message, specs: &[PayloadSpec]) -> Result<Decoded, SposError> {
    let first = specs.first().ok_or(SpecsVersionError::Empty)?;
    for spec in specs {
        if spec.name != first.name {
            return Err(SpecsVersionError::NameMismatch {
                expected: first.name.clone(),
                found: spec.name.clone(),
            }
            .into());
        }
        if !spec.meta.encode_version {
            return Err(SpecsVersionError::VersionNotEncoded {
                name: spec.name.clone(),
                version: spec.version,
            }
            .into());
        }
        if spec.meta.version_bits != first.meta.version_bits {
            return Err(SpecsVersionError::VersionBitsMismatch.into());
        }
    }
    for (i, spec) in specs.iter().enumerate() {
        if specs[..i].iter().any(|s| s.version == spec.version) {
            return Err(SpecsVersionError::DuplicateVersion {
                version: spec.version,
            }
            .into());
        }
    }

    let bits = message.to_bits().map_err(SposError::Decode)?;
    let reader = BitReader::new(&bits);
    let version = reader
        .peek(first.meta.version_bits)
        .map_err(DecodeError::from)
        .map_err(SposError::Decode)?;
    let spec = specs
        .iter()
        .find(|s| s.version == version)
        .ok_or(crate::block::SpecError::UnknownVersion { version })?;
    decode(message, spec)
}
