//! Bit-level buffer underlying cells, builders and slices.
//!
//! A [`BitString`] is an append-only sequence of bits capped at the cell
//! limit of 1023 bits. [`BitReader`] is a cursor over a finalized
//! `BitString`. Every higher-level store/load operation bottoms out here.

use crate::tvm::cell::MAX_CELL_BITS;
use crate::tvm::error::{CellError, Result};
use num_bigint::BigUint;

/// Append-only bit sequence with a 1023-bit capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitString {
    data: Vec<u8>,
    bit_len: usize,
}

impl BitString {
    /// Creates an empty bit string.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            bit_len: 0,
        }
    }

    /// Creates a bit string from raw big-endian bytes and an explicit bit
    /// length. Extra trailing bytes are dropped.
    pub fn from_raw(mut data: Vec<u8>, bit_len: usize) -> Result<Self> {
        if bit_len > MAX_CELL_BITS {
            return Err(CellError::CapacityExceeded {
                needed: bit_len,
                available: MAX_CELL_BITS,
            });
        }
        let required = (bit_len + 7) / 8;
        if data.len() < required {
            return Err(CellError::OutOfBounds {
                requested: bit_len,
                remaining: data.len() * 8,
            });
        }
        data.truncate(required);
        // Unused bits of the last byte are not meaningful; keep them zeroed
        // so equal bit strings compare equal byte-wise.
        if bit_len % 8 != 0 {
            if let Some(last) = data.last_mut() {
                *last &= 0xFFu8 << (8 - bit_len % 8);
            }
        }
        Ok(Self { data, bit_len })
    }

    /// Returns the written bits as raw bytes (last byte zero-padded).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns how many more bits fit before the 1023-bit cap.
    pub fn remaining_bits(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    /// Returns the data padded to a byte boundary with a single 1-bit stop
    /// marker when the bit length is not a multiple of 8. This is the form
    /// used for hashing and for BoC cell records.
    pub fn bytes_with_padding(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.bit_len % 8 != 0 {
            if let Some(last) = out.last_mut() {
                *last |= 1 << (7 - self.bit_len % 8);
            }
        }
        out
    }

    fn ensure_capacity(&self, extra: usize) -> Result<()> {
        if extra > self.remaining_bits() {
            return Err(CellError::CapacityExceeded {
                needed: extra,
                available: self.remaining_bits(),
            });
        }
        Ok(())
    }

    fn push_bit_unchecked(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.bit_len / 8] |= 1 << (7 - self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    /// Appends a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.ensure_capacity(1)?;
        self.push_bit_unchecked(bit);
        Ok(())
    }

    /// Appends `bit_len` bits taken MSB-first from `bits`.
    pub fn write_bits(&mut self, bits: &[u8], bit_len: usize) -> Result<()> {
        self.ensure_capacity(bit_len)?;
        let required = (bit_len + 7) / 8;
        if bits.len() < required {
            return Err(CellError::OutOfBounds {
                requested: bit_len,
                remaining: bits.len() * 8,
            });
        }
        for i in 0..bit_len {
            let bit = (bits[i / 8] >> (7 - i % 8)) & 1;
            self.push_bit_unchecked(bit == 1);
        }
        Ok(())
    }

    /// Appends whole bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_bits(bytes, bytes.len() * 8)
    }

    /// Appends the least significant `bits` of `value`, big-endian.
    ///
    /// Fails with [`CellError::ValueOutOfRange`] if `value` needs more than
    /// `bits` bits, without touching the buffer.
    pub fn write_uint(&mut self, value: u64, bits: usize) -> Result<()> {
        if bits > 64 || (bits < 64 && value >> bits != 0) {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits,
            });
        }
        self.ensure_capacity(bits)?;
        for i in (0..bits).rev() {
            self.push_bit_unchecked((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Appends a signed integer as `bits`-wide two's complement.
    pub fn write_int(&mut self, value: i64, bits: usize) -> Result<()> {
        if bits == 0 || bits > 64 {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits,
            });
        }
        if bits < 64 {
            let min = -(1i64 << (bits - 1));
            let max = (1i64 << (bits - 1)) - 1;
            if value < min || value > max {
                return Err(CellError::ValueOutOfRange {
                    value: value.to_string(),
                    bits,
                });
            }
        }
        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        self.write_uint((value as u64) & mask, bits)
    }

    /// Appends a variable-length unsigned integer: a `len_bits`-wide byte
    /// count followed by that many big-endian bytes. Zero encodes as byte
    /// count 0 with no payload.
    pub fn write_var_uint(&mut self, value: &BigUint, len_bits: usize) -> Result<()> {
        if len_bits == 0 || len_bits > 8 {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits: len_bits,
            });
        }
        let bytes = if value.bits() == 0 {
            Vec::new()
        } else {
            value.to_bytes_be()
        };
        let max_len = (1usize << len_bits) - 1;
        if bytes.len() > max_len {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits: max_len * 8,
            });
        }
        self.ensure_capacity(len_bits + bytes.len() * 8)?;
        self.write_uint(bytes.len() as u64, len_bits)?;
        self.write_bytes(&bytes)
    }
}

/// Read cursor over a [`BitString`].
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_len: usize,
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader positioned at the first bit.
    pub fn new(bits: &'a BitString) -> Self {
        Self {
            data: bits.data(),
            bit_len: bits.bit_len(),
            pos: 0,
        }
    }

    /// Creates a reader positioned `pos` bits in.
    pub fn with_offset(bits: &'a BitString, pos: usize) -> Result<Self> {
        if pos > bits.bit_len() {
            return Err(CellError::OutOfBounds {
                requested: pos,
                remaining: bits.bit_len(),
            });
        }
        Ok(Self {
            data: bits.data(),
            bit_len: bits.bit_len(),
            pos,
        })
    }

    /// Returns the current bit position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the number of unread bits.
    pub fn remaining(&self) -> usize {
        self.bit_len - self.pos
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(CellError::OutOfBounds {
                requested: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        self.ensure(1)?;
        let bit = (self.data[self.pos / 8] >> (7 - self.pos % 8)) & 1;
        self.pos += 1;
        Ok(bit == 1)
    }

    /// Reads `n` bits into a byte vector, MSB-first.
    pub fn read_bits(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure(n)?;
        let mut out = vec![0u8; (n + 7) / 8];
        for i in 0..n {
            let bit = (self.data[self.pos / 8] >> (7 - self.pos % 8)) & 1;
            if bit == 1 {
                out[i / 8] |= 1 << (7 - i % 8);
            }
            self.pos += 1;
        }
        Ok(out)
    }

    /// Reads an unsigned big-endian integer of the given width.
    pub fn read_uint(&mut self, bits: usize) -> Result<u64> {
        if bits > 64 {
            return Err(CellError::ValueOutOfRange {
                value: format!("{bits}-bit read"),
                bits: 64,
            });
        }
        self.ensure(bits)?;
        let mut result = 0u64;
        for _ in 0..bits {
            let bit = (self.data[self.pos / 8] >> (7 - self.pos % 8)) & 1;
            result = (result << 1) | bit as u64;
            self.pos += 1;
        }
        Ok(result)
    }

    /// Reads a signed two's-complement integer of the given width.
    pub fn read_int(&mut self, bits: usize) -> Result<i64> {
        if bits == 0 || bits > 64 {
            return Err(CellError::ValueOutOfRange {
                value: format!("{bits}-bit read"),
                bits: 64,
            });
        }
        let unsigned = self.read_uint(bits)?;
        let sign_bit = 1u64 << (bits - 1);
        if bits < 64 && unsigned & sign_bit != 0 {
            Ok((unsigned | (!0u64 << bits)) as i64)
        } else {
            Ok(unsigned as i64)
        }
    }

    /// Reads a variable-length unsigned integer written by
    /// [`BitString::write_var_uint`].
    pub fn read_var_uint(&mut self, len_bits: usize) -> Result<BigUint> {
        if len_bits == 0 || len_bits > 8 {
            return Err(CellError::ValueOutOfRange {
                value: format!("{len_bits}-bit length prefix"),
                bits: 8,
            });
        }
        let byte_len = self.read_uint(len_bits)? as usize;
        if byte_len == 0 {
            return Ok(BigUint::ZERO);
        }
        let bytes = self.read_bits(byte_len * 8)?;
        Ok(BigUint::from_bytes_be(&bytes))
    }

    /// Advances the cursor by `n` bits.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }
}
