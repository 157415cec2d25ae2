//! TVM (TON Virtual Machine) data structures and utilities
//!
//! This module provides the fundamental TON data model:
//! - Cell: the basic node holding up to 1023 bits and up to 4 references
//! - CellBuilder: single-use accumulator that finalizes into a cell
//! - Slice: a reader for sequentially accessing cell data
//! - BitString/BitReader: the bit-level buffer everything is built on
//! - BoC: Bag of Cells serialization format
//! - Address: TON address handling (internal and external addresses)

pub mod address;
pub mod bits;
pub mod boc;
pub mod builder;
pub mod cell;
pub mod error;
pub mod level_mask;
pub mod slice;
#[cfg(test)]
pub mod tests;

pub use address::{Address, ExternalAddress};
pub use bits::{BitReader, BitString};
pub use boc::{
    base64_to_boc, boc_to_base64, boc_to_hex, deserialize_boc, deserialize_boc_roots, hex_to_boc,
    serialize_boc, serialize_boc_with,
};
pub use builder::CellBuilder;
pub use cell::{ArcCell, Cell, CellType, MAX_CELL_BITS, MAX_CELL_LEVEL, MAX_CELL_REFS};
pub use error::CellError;
pub use level_mask::LevelMask;
pub use slice::Slice;
