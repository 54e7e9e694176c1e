//! Block type system.
//!
//! A payload spec's body is an ordered list of typed blocks, each owning
//! one slice of the bit stream. Raw JSON block descriptions are validated
//! into [`BlockDef`] values once, at spec compile time; the codec then
//! dispatches on the [`BlockKind`] tag.

mod error;
mod types;
mod validate;

pub use error::SpecError;
pub use types::{
    Approximation, ArrayBlock, BlockDef, BlockKind, CategoriesBlock, FloatBlock, IntegerBlock,
    IntegerMode, StaticCache, StepsBlock, StringBlock,
};
pub use validate::build_block;

pub(crate) use validate::check_unique_names;

/// Smallest width able to distinguish `codes` distinct values.
///
/// `width_for_codes(5) == 3`; a single code needs zero bits.
pub(crate) fn width_for_codes(codes: u64) -> u32 {
    if codes <= 1 {
        0
    } else {
        64 - (codes - 1).leading_zeros()
    }
}
