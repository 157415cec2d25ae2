//! Currency amounts and collections
//!
//! ```tlb
//! nanograms$_ amount:(VarUInteger 16) = Grams;
//! currencies$_ grams:Grams other:ExtraCurrencyCollection = CurrencyCollection;
//! ```

use crate::tvm::builder::CellBuilder;
use crate::tvm::cell::ArcCell;
use crate::tvm::error::Result;
use crate::tvm::slice::Slice;
use num_bigint::BigUint;

/// A native coin amount plus an optional extra-currency dictionary.
///
/// The extra-currency dictionary is carried opaquely as a cell reference;
/// this layer does not interpret its contents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CurrencyCollection {
    pub grams: BigUint,
    pub other: Option<ArcCell>,
}

impl CurrencyCollection {
    /// Creates a collection holding only native coins
    pub fn new(grams: BigUint) -> Self {
        Self { grams, other: None }
    }

    /// Writes `grams:(VarUInteger 16) other:(Maybe ^Cell)`
    pub fn store(&self, builder: &mut CellBuilder) -> Result<()> {
        builder.store_coins(&self.grams)?;
        builder.store_maybe_ref(self.other.clone())?;
        Ok(())
    }

    /// Reads the fields written by [`CurrencyCollection::store`]
    pub fn load(slice: &mut Slice) -> Result<Self> {
        Ok(Self {
            grams: slice.load_coins()?,
            other: slice.load_maybe_ref()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_round_trip() {
        let value = CurrencyCollection::new(BigUint::from(123_456_789u64));
        let mut builder = CellBuilder::new();
        value.store(&mut builder).unwrap();
        let cell = builder.build().unwrap();

        let loaded = CurrencyCollection::load(&mut Slice::new(cell)).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_zero_grams_is_single_nibble() {
        let value = CurrencyCollection::default();
        let mut builder = CellBuilder::new();
        value.store(&mut builder).unwrap();
        // 4-bit zero-length marker + 1 maybe bit, no payload bytes
        assert_eq!(builder.bit_len(), 5);

        let cell = builder.build().unwrap();
        let loaded = CurrencyCollection::load(&mut Slice::new(cell)).unwrap();
        assert_eq!(loaded.grams, BigUint::ZERO);
        assert!(loaded.other.is_none());
    }
}
