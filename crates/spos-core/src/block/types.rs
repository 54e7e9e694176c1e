//! Typed block definitions.

use serde_json::Value;
use spos_bits::Bits;

use super::width_for_codes;

/// Integer overflow handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegerMode {
    /// Saturate to the nearest representable endpoint.
    #[default]
    Truncate,
    /// Reduce modulo 2^bits.
    Remainder,
}

/// Float quantisation rounding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Approximation {
    /// Nearest level, ties to even.
    #[default]
    Round,
    Floor,
    Ceil,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerBlock {
    pub bits: u32,
    pub offset: i64,
    pub mode: IntegerMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatBlock {
    pub bits: u32,
    pub lower: f64,
    pub upper: f64,
    pub approximation: Approximation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringBlock {
    pub length: usize,
    /// Index -> char overrides of the standard table, both directions.
    pub custom_alphabeth: Vec<(u8, char)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepsBlock {
    /// Strictly ascending bucket boundaries.
    pub steps: Vec<f64>,
    /// One name per bucket; `steps.len() + 1` entries.
    pub names: Vec<String>,
    pub bits: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoriesBlock {
    pub categories: Vec<String>,
    /// Catch-all mapping for unknown values; encoding is an error without it.
    pub error: Option<String>,
    pub bits: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayBlock {
    /// Maximum (dynamic) or exact (fixed) element count.
    pub length: usize,
    pub fixed: bool,
    /// Count prefix width; zero in fixed mode.
    pub prefix_bits: u32,
    pub blocks: Box<BlockDef>,
}

/// Discriminated block payload. The codec dispatches on this tag.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Boolean,
    Binary { bits: u32 },
    Integer(IntegerBlock),
    Float(FloatBlock),
    Pad { bits: u32 },
    String(StringBlock),
    Steps(StepsBlock),
    Categories(CategoriesBlock),
    Array(ArrayBlock),
    Object { blocklist: Vec<BlockDef> },
}

/// Pre-encoded static value.
///
/// Blocks carrying a `value` encode it once at compile time; `projected`
/// is what that message decodes back to, which is also what decoding
/// surfaces for the block.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCache {
    pub bits: Bits,
    pub projected: Value,
}

/// A validated block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDef {
    pub key: String,
    pub alias: Option<String>,
    pub kind: BlockKind,
    pub static_cache: Option<StaticCache>,
}

impl BlockDef {
    /// Name used for this block in decode output.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.key)
    }

    /// Upper bound on the block's wire width in bits.
    pub fn max_width(&self) -> u64 {
        match &self.kind {
            BlockKind::Boolean => 1,
            BlockKind::Binary { bits } | BlockKind::Pad { bits } => u64::from(*bits),
            BlockKind::Integer(b) => u64::from(b.bits),
            BlockKind::Float(b) => u64::from(b.bits),
            BlockKind::String(b) => 6 * b.length as u64,
            BlockKind::Steps(b) => u64::from(b.bits),
            BlockKind::Categories(b) => u64::from(b.bits),
            BlockKind::Array(b) => {
                u64::from(b.prefix_bits) + b.length as u64 * b.blocks.max_width()
            }
            BlockKind::Object { blocklist } => blocklist.iter().map(BlockDef::max_width).sum(),
        }
    }

    /// The block's wire width when it does not depend on the value.
    pub fn fixed_width(&self) -> Option<u64> {
        match &self.kind {
            BlockKind::Array(b) if !b.fixed => None,
            BlockKind::Array(b) => {
                Some(b.length as u64 * b.blocks.fixed_width()?)
            }
            BlockKind::Object { blocklist } => blocklist
                .iter()
                .map(BlockDef::fixed_width)
                .sum::<Option<u64>>(),
            _ => Some(self.max_width()),
        }
    }
}

impl ArrayBlock {
    pub fn new(length: usize, fixed: bool, blocks: BlockDef) -> Self {
        let prefix_bits = if fixed {
            0
        } else {
            width_for_codes(length as u64 + 1)
        };
        ArrayBlock {
            length,
            fixed,
            prefix_bits,
            blocks: Box::new(blocks),
        }
    }
}

impl StepsBlock {
    /// Bucket index for `x`: the number of boundaries at or below it.
    pub fn bucket_of(&self, x: f64) -> u64 {
        self.steps.iter().filter(|&&s| x >= s).count() as u64
    }
}
