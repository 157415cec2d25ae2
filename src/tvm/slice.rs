//! Slice implementation for reading data from cells
//!
//! A [`Slice`] provides sequential read access to a cell's bits and
//! references, tracking a cursor for each. Schema decoders consume a slice
//! field by field.

use crate::tvm::address::Address;
use crate::tvm::bits::BitReader;
use crate::tvm::cell::ArcCell;
use crate::tvm::error::{CellError, Result};
use num_bigint::BigUint;

/// A read cursor over a cell's bits and references.
#[derive(Debug, Clone)]
pub struct Slice {
    cell: ArcCell,
    bit_pos: usize,
    ref_pos: usize,
}

impl Slice {
    /// Creates a new slice positioned at the start of the cell
    pub fn new(cell: ArcCell) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Returns the underlying cell
    pub fn cell(&self) -> &ArcCell {
        &self.cell
    }

    /// Returns the number of unread bits
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len().saturating_sub(self.bit_pos)
    }

    /// Returns the number of unread references
    pub fn remaining_refs(&self) -> usize {
        self.cell.reference_count().saturating_sub(self.ref_pos)
    }

    /// Whether both bits and references are exhausted
    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    /// Returns the current bit position
    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Returns the current reference position
    pub fn ref_position(&self) -> usize {
        self.ref_pos
    }

    fn reader(&self) -> Result<BitReader<'_>> {
        BitReader::with_offset(self.cell.bits(), self.bit_pos)
    }

    /// Loads a single bit
    pub fn load_bit(&mut self) -> Result<bool> {
        let mut reader = self.reader()?;
        let bit = reader.read_bit()?;
        self.bit_pos = reader.pos();
        Ok(bit)
    }

    /// Loads `n` bits into a byte vector, MSB-first
    pub fn load_bits(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut reader = self.reader()?;
        let bits = reader.read_bits(n)?;
        self.bit_pos = reader.pos();
        Ok(bits)
    }

    /// Loads a byte (8 bits)
    pub fn load_byte(&mut self) -> Result<u8> {
        Ok(self.load_bits(8)?[0])
    }

    /// Loads `n` bytes
    pub fn load_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.load_bits(n * 8)
    }

    /// Loads a u16 value (16 bits, big-endian)
    pub fn load_u16(&mut self) -> Result<u16> {
        Ok(self.load_uint(16)? as u16)
    }

    /// Loads a u32 value (32 bits, big-endian)
    pub fn load_u32(&mut self) -> Result<u32> {
        Ok(self.load_uint(32)? as u32)
    }

    /// Loads a u64 value (64 bits, big-endian)
    pub fn load_u64(&mut self) -> Result<u64> {
        self.load_uint(64)
    }

    /// Loads an unsigned integer with a specific bit width
    pub fn load_uint(&mut self, bits: usize) -> Result<u64> {
        let mut reader = self.reader()?;
        let value = reader.read_uint(bits)?;
        self.bit_pos = reader.pos();
        Ok(value)
    }

    /// Loads a signed integer with a specific bit width
    pub fn load_int(&mut self, bits: usize) -> Result<i64> {
        let mut reader = self.reader()?;
        let value = reader.read_int(bits)?;
        self.bit_pos = reader.pos();
        Ok(value)
    }

    /// Loads a variable-length unsigned integer
    pub fn load_var_uint(&mut self, len_bits: usize) -> Result<BigUint> {
        let mut reader = self.reader()?;
        let value = reader.read_var_uint(len_bits)?;
        self.bit_pos = reader.pos();
        Ok(value)
    }

    /// Loads a coin amount (VarUInteger 16)
    pub fn load_coins(&mut self) -> Result<BigUint> {
        self.load_var_uint(4)
    }

    /// Loads an address written by
    /// [`CellBuilder::store_address`](crate::tvm::CellBuilder::store_address):
    /// `None` for `addr_none$00`, an [`Address`] for `addr_std$10`. Other
    /// tags fail with [`CellError::SchemaMismatch`].
    pub fn load_address(&mut self) -> Result<Option<Address>> {
        match self.load_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(CellError::SchemaMismatch(
                        "anycast addresses are not supported".into(),
                    ));
                }
                let workchain = self.load_int(8)? as i8;
                let bytes = self.load_bytes(32)?;
                let mut hash_part = [0u8; 32];
                hash_part.copy_from_slice(&bytes);
                Ok(Some(Address::new(workchain, hash_part)))
            }
            tag => Err(CellError::SchemaMismatch(format!(
                "unsupported address tag {tag:#04b}"
            ))),
        }
    }

    /// Loads a reference to another cell
    pub fn load_ref(&mut self) -> Result<ArcCell> {
        let reference = self
            .cell
            .reference(self.ref_pos)
            .cloned()
            .ok_or_else(|| CellError::TruncatedCell("no references left to load".into()))?;
        self.ref_pos += 1;
        Ok(reference)
    }

    /// Loads an optional reference (`Maybe ^Cell`)
    pub fn load_maybe_ref(&mut self) -> Result<Option<ArcCell>> {
        if self.load_bit()? {
            Ok(Some(self.load_ref()?))
        } else {
            Ok(None)
        }
    }

    /// Reads a reference ahead of the cursor without advancing it
    pub fn preload_ref(&self, index: usize) -> Result<ArcCell> {
        let actual = self.ref_pos + index;
        self.cell.reference(actual).cloned().ok_or_else(|| {
            CellError::TruncatedCell(format!("no reference at index {actual}"))
        })
    }

    /// Skips a number of bits
    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        let mut reader = self.reader()?;
        reader.skip(n)?;
        self.bit_pos = reader.pos();
        Ok(())
    }

    /// Skips a number of references
    pub fn skip_refs(&mut self, n: usize) -> Result<()> {
        if n > self.remaining_refs() {
            return Err(CellError::TruncatedCell(format!(
                "cannot skip {n} references, only {} remaining",
                self.remaining_refs()
            )));
        }
        self.ref_pos += n;
        Ok(())
    }

    /// Loads all remaining bits
    pub fn load_remaining_bits(&mut self) -> Result<Vec<u8>> {
        let remaining = self.remaining_bits();
        self.load_bits(remaining)
    }

    /// Loads all remaining references
    pub fn load_remaining_refs(&mut self) -> Result<Vec<ArcCell>> {
        let mut refs = Vec::with_capacity(self.remaining_refs());
        while self.remaining_refs() > 0 {
            refs.push(self.load_ref()?);
        }
        Ok(refs)
    }

    /// Loads snake-encoded bytes: the remaining full bytes of this cell,
    /// then of every continuation cell linked by reference
    pub fn load_snake_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut slice = self.clone();
        loop {
            let bytes = slice.remaining_bits() / 8;
            out.extend_from_slice(&slice.load_bytes(bytes)?);
            if slice.remaining_refs() > 0 {
                slice = Slice::new(slice.load_ref()?);
            } else {
                break;
            }
        }
        self.bit_pos = self.cell.bit_len();
        self.ref_pos = self.cell.reference_count();
        Ok(out)
    }
}

impl From<ArcCell> for Slice {
    fn from(cell: ArcCell) -> Self {
        Self::new(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvm::builder::CellBuilder;
    use num_bigint::BigUint;

    #[test]
    fn test_slice_load_bits() {
        let mut builder = CellBuilder::new();
        builder.store_byte(0xFF).unwrap();
        builder.store_byte(0x00).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        assert_eq!(slice.remaining_bits(), 16);
        assert_eq!(slice.load_byte().unwrap(), 0xFF);
        assert_eq!(slice.load_byte().unwrap(), 0x00);
        assert!(slice.is_empty());
    }

    #[test]
    fn test_slice_load_uint_and_int() {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b10110, 5).unwrap();
        builder.store_int(-42, 8).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        assert_eq!(slice.load_uint(5).unwrap(), 0b10110);
        assert_eq!(slice.load_int(8).unwrap(), -42);
    }

    #[test]
    fn test_slice_load_coins() {
        let amount = BigUint::from(1_000_000_000u64);
        let mut builder = CellBuilder::new();
        builder.store_coins(&amount).unwrap();
        builder.store_coins(&BigUint::ZERO).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        assert_eq!(slice.load_coins().unwrap(), amount);
        assert_eq!(slice.load_coins().unwrap(), BigUint::ZERO);
        assert!(slice.is_empty());
    }

    #[test]
    fn test_slice_load_address_round_trip() {
        let addr = Address::new(0, [0x42; 32]);
        let mut builder = CellBuilder::new();
        builder.store_address(Some(&addr)).unwrap();
        builder.store_address(None).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        let loaded = slice.load_address().unwrap().unwrap();
        assert_eq!(loaded.workchain, 0);
        assert_eq!(loaded.hash_part, [0x42; 32]);
        assert!(slice.load_address().unwrap().is_none());
    }

    #[test]
    fn test_slice_load_reference() {
        let child = CellBuilder::new().build().unwrap();
        let mut builder = CellBuilder::new();
        builder.store_ref(child.clone()).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        assert_eq!(slice.remaining_refs(), 1);
        let loaded = slice.load_ref().unwrap();
        assert_eq!(loaded.hash(), child.hash());
        assert!(matches!(
            slice.load_ref().unwrap_err(),
            CellError::TruncatedCell(_)
        ));
    }

    #[test]
    fn test_slice_skip() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0x12345678).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        slice.skip_bits(16).unwrap();
        assert_eq!(slice.load_u16().unwrap(), 0x5678);
    }

    #[test]
    fn test_slice_out_of_bounds() {
        let mut builder = CellBuilder::new();
        builder.store_byte(0xAB).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        let err = slice.load_uint(16).unwrap_err();
        assert!(matches!(err, CellError::OutOfBounds { .. }));
        // cursor untouched by the failed read
        assert_eq!(slice.load_byte().unwrap(), 0xAB);
    }

    #[test]
    fn test_slice_snake_round_trip() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(300).collect();
        let mut builder = CellBuilder::new();
        builder.store_snake_bytes(&payload).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = Slice::new(cell);
        assert_eq!(slice.load_snake_bytes().unwrap(), payload);
        assert!(slice.is_empty());
    }
}
