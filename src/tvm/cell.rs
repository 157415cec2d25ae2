//! Cell implementation for TON blockchain
//!
//! A cell is the fundamental node of the TON data model: up to 1023 bits of
//! data and up to 4 references to other cells. Cells are immutable once
//! constructed; their content hash and depth are computed lazily per level
//! and memoized, and two cells compare equal exactly when their level-0
//! hashes match.

use crate::tvm::bits::BitString;
use crate::tvm::error::{CellError, Result};
use crate::tvm::level_mask::LevelMask;
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};

/// Maximum number of bits a cell can store
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can have
pub const MAX_CELL_REFS: usize = 4;

/// Cell level range (0-3)
pub const MAX_CELL_LEVEL: u8 = 3;

/// Shared handle to an immutable cell.
pub type ArcCell = Arc<Cell>;

/// The closed set of cell variants sharing the hashing contract.
///
/// Exotic variants carry their discriminator as the first byte of their
/// data, matching the wire form of BoC records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellType {
    #[default]
    Ordinary,
    PrunedBranch,
    LibraryReference,
    MerkleProof,
    MerkleUpdate,
}

impl CellType {
    /// Whether this is an exotic (special) cell type.
    pub fn is_exotic(&self) -> bool {
        !matches!(self, CellType::Ordinary)
    }

    /// Resolves an exotic discriminator byte.
    pub fn from_exotic_tag(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(CellType::PrunedBranch),
            2 => Ok(CellType::LibraryReference),
            3 => Ok(CellType::MerkleProof),
            4 => Ok(CellType::MerkleUpdate),
            _ => Err(CellError::MalformedContainer(format!(
                "unknown exotic cell tag {tag}"
            ))),
        }
    }
}

/// Represents a cell in the TON blockchain
#[derive(Debug, Clone)]
pub struct Cell {
    /// Finalized cell data
    bits: BitString,
    /// References to other cells
    references: Vec<ArcCell>,
    /// Cell variant
    cell_type: CellType,
    /// Per-level (hash, depth), computed once on first access
    hashes: OnceLock<[([u8; 32], u16); 4]>,
}

impl Cell {
    /// Creates an ordinary cell with the given data and bit length, without
    /// references.
    pub fn with_data(data: Vec<u8>, bit_len: usize) -> Result<Self> {
        Self::from_parts(
            BitString::from_raw(data, bit_len)?,
            Vec::new(),
            CellType::Ordinary,
        )
    }

    /// Assembles a cell from finalized parts, validating the structural
    /// constraints of its variant. The only entry points are the builder
    /// (ordinary cells) and BoC deserialization (any variant).
    pub(crate) fn from_parts(
        bits: BitString,
        references: Vec<ArcCell>,
        cell_type: CellType,
    ) -> Result<Self> {
        if references.len() > MAX_CELL_REFS {
            return Err(CellError::TooManyReferences { max: MAX_CELL_REFS });
        }
        let cell = Self {
            bits,
            references,
            cell_type,
            hashes: OnceLock::new(),
        };
        cell.check_layout()?;
        Ok(cell)
    }

    fn check_layout(&self) -> Result<()> {
        let byte_len = self.bits.bit_len() / 8;
        let aligned = self.bits.bit_len() % 8 == 0;
        let expect = |ok: bool, what: &str| -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(CellError::MalformedContainer(format!(
                    "invalid {:?} cell: expected {what}, got {} bits and {} refs",
                    self.cell_type,
                    self.bits.bit_len(),
                    self.references.len()
                )))
            }
        };
        match self.cell_type {
            CellType::Ordinary => Ok(()),
            CellType::PrunedBranch => {
                expect(
                    aligned && byte_len >= 2 && self.references.is_empty(),
                    "a mask byte plus stored hashes and no refs",
                )?;
                let level = LevelMask::new(self.bits.data()[1]).level() as usize;
                expect(
                    self.bits.data()[1] <= 7
                        && (1..=3).contains(&level)
                        && byte_len == 2 + 34 * level,
                    "1-3 stored (hash, depth) pairs",
                )
            }
            CellType::LibraryReference => expect(
                aligned && byte_len == 33 && self.references.is_empty(),
                "a tag byte plus a 256-bit library hash and no refs",
            ),
            CellType::MerkleProof => expect(
                aligned && byte_len == 35 && self.references.len() == 1,
                "a tag byte, a 256-bit hash, a 16-bit depth and one ref",
            ),
            CellType::MerkleUpdate => expect(
                aligned && byte_len == 69 && self.references.len() == 2,
                "a tag byte, two 256-bit hashes, two 16-bit depths and two refs",
            ),
        }
    }

    /// Returns the cell's data (last byte zero-padded)
    pub fn data(&self) -> &[u8] {
        self.bits.data()
    }

    /// Returns the cell's data as a bit string
    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    /// Returns the number of bits in the cell
    pub fn bit_len(&self) -> usize {
        self.bits.bit_len()
    }

    /// Returns the cell's references
    pub fn references(&self) -> &[ArcCell] {
        &self.references
    }

    /// Returns the number of references
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Gets a reference by index
    pub fn reference(&self, index: usize) -> Option<&ArcCell> {
        self.references.get(index)
    }

    /// Returns the cell variant
    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// Returns whether this is an exotic cell
    pub fn is_exotic(&self) -> bool {
        self.cell_type.is_exotic()
    }

    /// Returns the cell's level mask
    pub fn level_mask(&self) -> LevelMask {
        match self.cell_type {
            CellType::Ordinary => self
                .references
                .iter()
                .fold(LevelMask::default(), |acc, r| acc | r.level_mask()),
            CellType::LibraryReference => LevelMask::default(),
            // layout is validated at construction
            CellType::PrunedBranch => LevelMask::new(self.bits.data()[1]),
            CellType::MerkleProof | CellType::MerkleUpdate => self
                .references
                .iter()
                .fold(LevelMask::default(), |acc, r| acc | r.level_mask())
                .shift(1),
        }
    }

    /// Returns the cell's level (0-3)
    pub fn level(&self) -> u8 {
        self.level_mask().level()
    }

    /// Computes the cell's descriptor pair as used in hashing and in BoC
    /// records: `d1 = refs + 8*exotic + 32*level_mask`,
    /// `d2 = floor(bits/8) + ceil(bits/8)`.
    pub fn descriptors(&self) -> [u8; 2] {
        [
            self.refs_descriptor(self.level_mask()),
            self.bits_descriptor(),
        ]
    }

    fn refs_descriptor(&self, mask: LevelMask) -> u8 {
        self.references.len() as u8 + if self.is_exotic() { 8 } else { 0 } + mask.as_u8() * 32
    }

    fn bits_descriptor(&self) -> u8 {
        let b = self.bits.bit_len();
        (b / 8 + (b + 7) / 8) as u8
    }

    /// Serializes the cell data with the stop-bit padding marker if needed
    pub fn serialize_data(&self) -> Vec<u8> {
        self.bits.bytes_with_padding()
    }

    /// Returns the representation hash at level 0, the cell's canonical
    /// content-addressed identity.
    pub fn hash(&self) -> [u8; 32] {
        self.hash_at_level(0)
    }

    /// Returns the depth at level 0.
    pub fn depth(&self) -> u16 {
        self.depth_at_level(0)
    }

    /// Returns the hash exposed at the given level (clamped to 3).
    pub fn hash_at_level(&self, level: u8) -> [u8; 32] {
        self.level_data()[level.min(MAX_CELL_LEVEL) as usize].0
    }

    /// Returns the depth exposed at the given level (clamped to 3).
    pub fn depth_at_level(&self, level: u8) -> u16 {
        self.level_data()[level.min(MAX_CELL_LEVEL) as usize].1
    }

    fn level_data(&self) -> &[([u8; 32], u16); 4] {
        self.hashes.get_or_init(|| {
            let mut out = [([0u8; 32], 0u16); 4];
            for (level, slot) in out.iter_mut().enumerate() {
                *slot = self.compute_hash_depth(level as u8);
            }
            out
        })
    }

    fn compute_hash_depth(&self, level: u8) -> ([u8; 32], u16) {
        match self.cell_type {
            CellType::Ordinary | CellType::LibraryReference => {
                self.representation_hash_depth(level)
            }
            CellType::PrunedBranch => self.pruned_hash_depth(level),
            CellType::MerkleProof | CellType::MerkleUpdate => self.merkle_hash_depth(level),
        }
    }

    /// Standard representation hash: descriptors, padded data, then the
    /// depth and hash of every reference. Cells whose mask distinguishes
    /// lower layers chain the previous layer's hash in place of the data.
    fn representation_hash_depth(&self, level: u8) -> ([u8; 32], u16) {
        let full_mask = self.level_mask();
        let max_level = full_mask.apply(level).level();
        let mut hash = [0u8; 32];
        let mut chained = false;
        for current in 0..=max_level {
            let applied = full_mask.apply(current);
            let child_level = applied.level();
            let mut hasher = Sha256::new();
            hasher.update([self.refs_descriptor(applied), self.bits_descriptor()]);
            if chained {
                hasher.update(hash);
            } else {
                hasher.update(self.bits.bytes_with_padding());
            }
            for r in &self.references {
                hasher.update(r.depth_at_level(child_level).to_be_bytes());
            }
            for r in &self.references {
                hasher.update(r.hash_at_level(child_level));
            }
            hash = hasher.finalize().into();
            chained = true;
        }
        let depth = self
            .references
            .iter()
            .map(|r| r.depth_at_level(level))
            .max()
            .map(|d| d + 1)
            .unwrap_or(0);
        (hash, depth)
    }

    /// A pruned branch answers for the layers it has pruned away with the
    /// (hash, depth) pairs stored in its data; above those it hashes like a
    /// childless cell of its own data.
    fn pruned_hash_depth(&self, level: u8) -> ([u8; 32], u16) {
        let mask = self.level_mask();
        if mask.contains(level) {
            let raw = self.bits.data();
            let stored = mask.level() as usize;
            let level = level as usize;
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&raw[2 + 32 * level..2 + 32 * (level + 1)]);
            let off = 2 + 32 * stored + 2 * level;
            let depth = u16::from_be_bytes([raw[off], raw[off + 1]]);
            (hash, depth)
        } else {
            let mut hasher = Sha256::new();
            hasher.update([self.refs_descriptor(mask), self.bits_descriptor()]);
            hasher.update(self.bits.bytes_with_padding());
            (hasher.finalize().into(), 0)
        }
    }

    /// Merkle cells hash and measure their children one level up.
    fn merkle_hash_depth(&self, level: u8) -> ([u8; 32], u16) {
        let child_level = level.saturating_add(1).min(MAX_CELL_LEVEL);
        let applied = self.level_mask().apply(level);
        let mut hasher = Sha256::new();
        hasher.update([self.refs_descriptor(applied), self.bits_descriptor()]);
        hasher.update(self.bits.bytes_with_padding());
        for r in &self.references {
            hasher.update(r.depth_at_level(child_level).to_be_bytes());
        }
        for r in &self.references {
            hasher.update(r.hash_at_level(child_level));
        }
        let depth = self
            .references
            .iter()
            .map(|r| r.depth_at_level(child_level))
            .max()
            .map(|d| d + 1)
            .unwrap_or(0);
        (hasher.finalize().into(), depth)
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write(&Cell::hash(self));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_empty_cell() {
        let cell = Cell::with_data(Vec::new(), 0).unwrap();
        assert_eq!(cell.bit_len(), 0);
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(cell.level(), 0);
        assert!(!cell.is_exotic());
        assert_eq!(
            cell.hash(),
            hex!("96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7")
        );
        assert_eq!(cell.depth(), 0);
    }

    #[test]
    fn test_cell_hash() {
        let cell = Cell::with_data(vec![0x00, 0x00, 0x00, 0x0F], 32).unwrap();
        assert_eq!(
            cell.hash(),
            hex!("57b520dbcb9d135863fc33963cde9f6db2ded1430d88056810a2c9434a3860f9")
        );
    }

    #[test]
    fn test_hash_deterministic() {
        let cell = Cell::with_data(vec![0xAB, 0xCD], 16).unwrap();
        assert_eq!(cell.hash(), cell.hash());
        assert_eq!(cell.depth(), 0);
    }

    #[test]
    fn test_ordinary_hash_same_at_all_levels() {
        let cell = Cell::with_data(vec![0x42], 8).unwrap();
        let h0 = cell.hash_at_level(0);
        assert_eq!(h0, cell.hash_at_level(1));
        assert_eq!(h0, cell.hash_at_level(2));
        assert_eq!(h0, cell.hash_at_level(3));
    }

    #[test]
    fn test_depth_follows_children() {
        let leaf = Arc::new(Cell::with_data(vec![0x01], 8).unwrap());
        let mid =
            Arc::new(Cell::from_parts(BitString::new(), vec![leaf], CellType::Ordinary).unwrap());
        let root = Cell::from_parts(BitString::new(), vec![mid], CellType::Ordinary).unwrap();
        assert_eq!(root.depth(), 2);
    }

    #[test]
    fn test_equality_is_content_addressed() {
        let a = Cell::with_data(vec![0x12, 0x34], 16).unwrap();
        let b = Cell::with_data(vec![0x12, 0x34], 16).unwrap();
        let c = Cell::with_data(vec![0x12, 0x35], 16).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_descriptors() {
        let cell = Cell::with_data(vec![0x80], 1).unwrap();
        // 1 bit: d1 = 0 refs, d2 = 0 + 1
        assert_eq!(cell.descriptors(), [0, 1]);
        // padding marker right after the single data bit
        assert_eq!(cell.serialize_data(), vec![0b1100_0000]);
    }

    #[test]
    fn test_pruned_branch_exposes_stored_pairs() {
        // tag, mask 0b001, one stored hash of 0x11.., depth 5
        let mut data = vec![1u8, 0b001];
        data.extend_from_slice(&[0x11; 32]);
        data.extend_from_slice(&5u16.to_be_bytes());
        let bits = BitString::from_raw(data, 36 * 8).unwrap();
        let cell = Cell::from_parts(bits, Vec::new(), CellType::PrunedBranch).unwrap();

        assert_eq!(cell.level(), 1);
        assert_eq!(cell.hash_at_level(0), [0x11; 32]);
        assert_eq!(cell.depth_at_level(0), 5);
        // above the mask the cell hashes as its own data
        assert_ne!(cell.hash_at_level(1), [0x11; 32]);
        assert_eq!(cell.depth_at_level(1), 0);
    }

    #[test]
    fn test_pruned_branch_layout_validated() {
        // mask says one stored pair but the data is too short
        let bits = BitString::from_raw(vec![1u8, 0b001, 0xAA], 24).unwrap();
        let err = Cell::from_parts(bits, Vec::new(), CellType::PrunedBranch).unwrap_err();
        assert!(matches!(err, CellError::MalformedContainer(_)));
    }

    #[test]
    fn test_too_many_references() {
        let leaf = Arc::new(Cell::with_data(vec![0x01], 8).unwrap());
        let refs = vec![leaf; MAX_CELL_REFS + 1];
        let err = Cell::from_parts(BitString::new(), refs, CellType::Ordinary).unwrap_err();
        assert!(matches!(err, CellError::TooManyReferences { .. }));
    }
}
