//! StateInit block
//!
//! ```tlb
//! _ split_depth:(Maybe (## 5)) special:(Maybe TickTock)
//!   code:(Maybe ^Cell) data:(Maybe ^Cell)
//!   library:(Maybe ^Cell) = StateInit;
//! ```
//!
//! The level-0 hash of an account's StateInit cell is its address.

use crate::tvm::builder::CellBuilder;
use crate::tvm::cell::ArcCell;
use crate::tvm::error::Result;
use crate::tvm::slice::Slice;

/// ```tlb
/// tick_tock$_ tick:Bool tock:Bool = TickTock;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTock {
    pub tick: bool,
    pub tock: bool,
}

impl TickTock {
    pub fn store(&self, builder: &mut CellBuilder) -> Result<()> {
        builder.store_bit(self.tick)?;
        builder.store_bit(self.tock)?;
        Ok(())
    }

    pub fn load(slice: &mut Slice) -> Result<Self> {
        Ok(Self {
            tick: slice.load_bit()?,
            tock: slice.load_bit()?,
        })
    }
}

/// Initial code, data and library of an account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateInit {
    pub split_depth: Option<u8>,
    pub special: Option<TickTock>,
    pub code: Option<ArcCell>,
    pub data: Option<ArcCell>,
    pub library: Option<ArcCell>,
}

impl StateInit {
    /// Creates a state-init from code and data cells
    pub fn with_code_and_data(code: ArcCell, data: ArcCell) -> Self {
        Self {
            code: Some(code),
            data: Some(data),
            ..Default::default()
        }
    }

    /// Writes the fields in schema order
    pub fn store(&self, builder: &mut CellBuilder) -> Result<()> {
        match self.split_depth {
            Some(depth) => {
                builder.store_bit(true)?;
                builder.store_uint(depth as u64, 5)?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }
        match &self.special {
            Some(tick_tock) => {
                builder.store_bit(true)?;
                tick_tock.store(builder)?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }
        builder.store_maybe_ref(self.code.clone())?;
        builder.store_maybe_ref(self.data.clone())?;
        builder.store_maybe_ref(self.library.clone())?;
        Ok(())
    }

    /// Reads the fields written by [`StateInit::store`]
    pub fn load(slice: &mut Slice) -> Result<Self> {
        let split_depth = if slice.load_bit()? {
            Some(slice.load_uint(5)? as u8)
        } else {
            None
        };
        let special = if slice.load_bit()? {
            Some(TickTock::load(slice)?)
        } else {
            None
        };
        Ok(Self {
            split_depth,
            special,
            code: slice.load_maybe_ref()?,
            data: slice.load_maybe_ref()?,
            library: slice.load_maybe_ref()?,
        })
    }

    /// Encodes into its own cell
    pub fn to_cell(&self) -> Result<ArcCell> {
        let mut builder = CellBuilder::new();
        self.store(&mut builder)?;
        builder.build()
    }

    /// Decodes from a cell
    pub fn from_cell(cell: &ArcCell) -> Result<Self> {
        Self::load(&mut Slice::new(cell.clone()))
    }

    /// The account address derived from this state-init: its workchain is
    /// chosen by the deployer, the account id is the cell's level-0 hash.
    pub fn account_id(&self) -> Result<[u8; 32]> {
        Ok(self.to_cell()?.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvm::boc::hex_to_boc;
    use crate::tvm::builder::CellBuilder;
    use crate::tvm::Address;
    use hex_literal::hex;

    #[test]
    fn test_state_init_round_trip() {
        let code = {
            let mut b = CellBuilder::new();
            b.store_u32(0xC0DE).unwrap();
            b.build().unwrap()
        };
        let data = {
            let mut b = CellBuilder::new();
            b.store_u32(0xDA7A).unwrap();
            b.build().unwrap()
        };
        let init = StateInit {
            split_depth: Some(3),
            special: Some(TickTock {
                tick: true,
                tock: false,
            }),
            code: Some(code),
            data: Some(data),
            library: None,
        };

        let cell = init.to_cell().unwrap();
        let loaded = StateInit::from_cell(&cell).unwrap();
        assert_eq!(loaded, init);
    }

    #[test]
    fn test_empty_state_init_is_five_bits() {
        let cell = StateInit::default().to_cell().unwrap();
        assert_eq!(cell.bit_len(), 5);
        assert_eq!(cell.reference_count(), 0);
    }

    #[test]
    fn test_nft_marketplace_account_id_vector() {
        // code cell of the NFT marketplace contract, data cell holding the
        // admin address: the state-init hash is the contract's account id
        let code = hex_to_boc(
            "B5EE9C7241010401006D000114FF00F4A413F4BCF2C80B01020120020300AAD23221C700915BE0D0D3\
             030171B0915BE0FA40ED44D0FA403012C705F2E19101D31F01C0018E2BFA003001D4D43021F90070C8\
             CA07CBFFC9D077748018C8CB05CB0258CF165004FA0213CB6BCCCCC971FB00915BE20004F2308EF7CC\
             E7",
        )
        .unwrap();
        let data = {
            let mut b = CellBuilder::new();
            b.store_address(Some(&Address::new(0, [0u8; 32]))).unwrap();
            b.build().unwrap()
        };

        let init = StateInit::with_code_and_data(code, data);
        assert_eq!(
            init.account_id().unwrap(),
            hex!("c6c93f3661d735522ea41e46dc67135db4cc15b74b4c6c6d3fb717d2cbf917aa")
        );
    }
}
