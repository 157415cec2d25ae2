//! Builder for constructing cells
//!
//! A [`CellBuilder`] accumulates typed fields bit by bit and finalizes into
//! an immutable [`Cell`]. Builders are single-use: [`CellBuilder::build`]
//! consumes the builder, so reuse after finalization is rejected by the
//! compiler rather than at run time.
//!
//! Every store operation validates capacity before touching the buffer, so
//! a failed store leaves the builder exactly as it was.
//!
//! # Example
//!
//! ```rust
//! use toncell_rs::tvm::CellBuilder;
//!
//! let mut builder = CellBuilder::new();
//! builder.store_u32(0x12345678).unwrap();
//! builder.store_bit(true).unwrap();
//! let cell = builder.build().unwrap();
//! assert_eq!(cell.bit_len(), 33);
//! ```

use crate::tvm::address::{Address, ExternalAddress};
use crate::tvm::bits::BitString;
use crate::tvm::cell::{ArcCell, Cell, CellType, MAX_CELL_BITS, MAX_CELL_REFS};
use crate::tvm::error::{CellError, Result};
use crate::tvm::slice::Slice;
use num_bigint::BigUint;
use std::sync::Arc;

/// Single-use accumulator that finalizes into an immutable [`Cell`].
#[derive(Debug, Default)]
pub struct CellBuilder {
    bits: BitString,
    references: Vec<ArcCell>,
}

impl CellBuilder {
    /// Creates a new cell builder
    pub fn new() -> Self {
        Self {
            bits: BitString::new(),
            references: Vec::new(),
        }
    }

    /// Returns the number of bits stored so far
    pub fn bit_len(&self) -> usize {
        self.bits.bit_len()
    }

    /// Returns the number of bits still available
    pub fn remaining_bits(&self) -> usize {
        self.bits.remaining_bits()
    }

    /// Returns the number of references stored so far
    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Returns the number of references still available
    pub fn remaining_refs(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    fn ensure_bits(&self, needed: usize) -> Result<()> {
        if needed > self.remaining_bits() {
            return Err(CellError::CapacityExceeded {
                needed,
                available: self.remaining_bits(),
            });
        }
        Ok(())
    }

    fn ensure_refs(&self, needed: usize) -> Result<()> {
        if needed > self.remaining_refs() {
            return Err(CellError::TooManyReferences { max: MAX_CELL_REFS });
        }
        Ok(())
    }

    /// Stores a single bit
    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self> {
        self.bits.write_bit(bit)?;
        Ok(self)
    }

    /// Stores a boolean value as a single bit
    pub fn store_bool(&mut self, value: bool) -> Result<&mut Self> {
        self.store_bit(value)
    }

    /// Stores `bit_len` bits taken MSB-first from a byte slice
    pub fn store_bits(&mut self, bits: &[u8], bit_len: usize) -> Result<&mut Self> {
        self.bits.write_bits(bits, bit_len)?;
        Ok(self)
    }

    /// Stores a byte
    pub fn store_byte(&mut self, byte: u8) -> Result<&mut Self> {
        self.store_bits(&[byte], 8)
    }

    /// Stores multiple bytes
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        self.bits.write_bytes(bytes)?;
        Ok(self)
    }

    /// Stores a u32 value
    pub fn store_u32(&mut self, value: u32) -> Result<&mut Self> {
        self.store_bits(&value.to_be_bytes(), 32)
    }

    /// Stores a u64 value
    pub fn store_u64(&mut self, value: u64) -> Result<&mut Self> {
        self.store_bits(&value.to_be_bytes(), 64)
    }

    /// Stores an unsigned integer with a specific bit width.
    /// Fails with [`CellError::ValueOutOfRange`] if the value does not fit.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self> {
        self.bits.write_uint(value, bits)?;
        Ok(self)
    }

    /// Stores a signed integer with a specific bit width (two's complement)
    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self> {
        self.bits.write_int(value, bits)?;
        Ok(self)
    }

    /// Stores a variable-length unsigned integer: a `len_bits`-wide byte
    /// count followed by that many big-endian bytes
    pub fn store_var_uint(&mut self, value: &BigUint, len_bits: usize) -> Result<&mut Self> {
        self.bits.write_var_uint(value, len_bits)?;
        Ok(self)
    }

    /// Stores a coin amount (VarUInteger 16): a 4-bit length nibble plus up
    /// to 15 value bytes. Zero encodes as the bare zero nibble.
    pub fn store_coins(&mut self, amount: &BigUint) -> Result<&mut Self> {
        self.store_var_uint(amount, 4)
    }

    /// Stores a TON address: `addr_none$00` for `None`, otherwise
    /// `addr_std$10` with no anycast, an 8-bit signed workchain and the
    /// 256-bit account id.
    pub fn store_address(&mut self, address: Option<&Address>) -> Result<&mut Self> {
        match address {
            None => {
                self.store_uint(0b00, 2)?;
            }
            Some(addr) => {
                self.ensure_bits(2 + 1 + 8 + 256)?;
                self.store_uint(0b10, 2)?;
                self.store_bit(false)?; // no anycast
                self.store_int(addr.workchain as i64, 8)?;
                self.store_bytes(&addr.hash_part)?;
            }
        }
        Ok(self)
    }

    /// Stores an external address: `addr_extern$01 len:(## 9) bits`
    pub fn store_external_address(&mut self, address: &ExternalAddress) -> Result<&mut Self> {
        self.ensure_bits(2 + 9 + address.bit_len)?;
        self.store_uint(0b01, 2)?;
        self.store_uint(address.bit_len as u64, 9)?;
        if let Some(value) = address.value {
            self.store_uint(value, address.bit_len)?;
        }
        Ok(self)
    }

    /// Stores a reference to another cell
    pub fn store_ref(&mut self, cell: ArcCell) -> Result<&mut Self> {
        self.ensure_refs(1)?;
        self.references.push(cell);
        Ok(self)
    }

    /// Stores an optional reference (`Maybe ^Cell`)
    pub fn store_maybe_ref(&mut self, cell: Option<ArcCell>) -> Result<&mut Self> {
        match cell {
            Some(c) => {
                self.ensure_bits(1)?;
                self.ensure_refs(1)?;
                self.store_bit(true)?;
                self.store_ref(c)?;
            }
            None => {
                self.store_bit(false)?;
            }
        }
        Ok(self)
    }

    /// Stores the bits and references of another cell inline
    pub fn store_cell(&mut self, cell: &Cell) -> Result<&mut Self> {
        self.ensure_bits(cell.bit_len())?;
        self.ensure_refs(cell.reference_count())?;
        self.store_bits(cell.data(), cell.bit_len())?;
        for reference in cell.references() {
            self.store_ref(reference.clone())?;
        }
        Ok(self)
    }

    /// Stores the remainder of a slice inline, consuming it
    pub fn store_slice(&mut self, slice: &mut Slice) -> Result<&mut Self> {
        self.ensure_bits(slice.remaining_bits())?;
        self.ensure_refs(slice.remaining_refs())?;
        let bits = slice.remaining_bits();
        if bits > 0 {
            let data = slice.load_bits(bits)?;
            self.store_bits(&data, bits)?;
        }
        while slice.remaining_refs() > 0 {
            let reference = slice.load_ref()?;
            self.store_ref(reference)?;
        }
        Ok(self)
    }

    /// Stores a short string (at most 127 bytes)
    pub fn store_string(&mut self, s: &str) -> Result<&mut Self> {
        let bytes = s.as_bytes();
        if bytes.len() > 127 {
            return Err(CellError::CapacityExceeded {
                needed: bytes.len() * 8,
                available: MAX_CELL_BITS,
            });
        }
        self.store_bytes(bytes)
    }

    /// Stores bytes using snake encoding, continuing into child cells when
    /// the current cell overflows
    pub fn store_snake_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        if bytes.is_empty() {
            return Ok(self);
        }
        let available = self.remaining_bits() / 8;
        if bytes.len() <= available {
            return self.store_bytes(bytes);
        }
        self.store_bytes(&bytes[..available])?;
        let mut next = CellBuilder::new();
        next.store_snake_bytes(&bytes[available..])?;
        self.store_ref(next.build()?)?;
        Ok(self)
    }

    /// Stores a string using snake encoding (for strings over 127 bytes)
    pub fn store_snake_string(&mut self, s: &str, with_prefix: bool) -> Result<&mut Self> {
        let mut bytes = s.as_bytes().to_vec();
        if with_prefix {
            bytes.insert(0, 0x00);
        }
        self.store_snake_bytes(&bytes)
    }

    /// Finalizes the builder into an immutable cell
    pub fn build(self) -> Result<ArcCell> {
        let cell = Cell::from_parts(self.bits, self.references, CellType::Ordinary)?;
        Ok(Arc::new(cell))
    }

    /// Finalizes into a cell and wraps it in a read cursor
    pub fn build_slice(self) -> Result<Slice> {
        Ok(Slice::new(self.build()?))
    }
}
