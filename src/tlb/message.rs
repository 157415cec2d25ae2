//! Message envelopes
//!
//! ```tlb
//! message$_ {X:Type} info:CommonMsgInfo
//!   init:(Maybe (Either StateInit ^StateInit))
//!   body:(Either X ^X) = Message X;
//! ```

use crate::tlb::currency::CurrencyCollection;
use crate::tlb::state_init::StateInit;
use crate::tvm::address::{Address, ExternalAddress};
use crate::tvm::builder::CellBuilder;
use crate::tvm::cell::ArcCell;
use crate::tvm::error::{CellError, Result};
use crate::tvm::slice::Slice;
use num_bigint::BigUint;

/// ```tlb
/// int_msg_info$0 ihr_disabled:Bool bounce:Bool bounced:Bool
///   src:MsgAddress dest:MsgAddressInt
///   value:CurrencyCollection ihr_fee:Grams fwd_fee:Grams
///   created_lt:uint64 created_at:uint32
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalMsgInfo {
    pub ihr_disabled: bool,
    pub bounce: bool,
    pub bounced: bool,
    pub src: Option<Address>,
    pub dest: Address,
    pub value: CurrencyCollection,
    pub ihr_fee: BigUint,
    pub fwd_fee: BigUint,
    pub created_lt: u64,
    pub created_at: u32,
}

impl InternalMsgInfo {
    /// A plain value transfer: fees and timestamps are filled in by the
    /// network, the source by the sending node.
    pub fn transfer(dest: Address, grams: BigUint, bounce: bool) -> Self {
        Self {
            ihr_disabled: true,
            bounce,
            bounced: false,
            src: None,
            dest,
            value: CurrencyCollection::new(grams),
            ihr_fee: BigUint::ZERO,
            fwd_fee: BigUint::ZERO,
            created_lt: 0,
            created_at: 0,
        }
    }

    fn store(&self, builder: &mut CellBuilder) -> Result<()> {
        builder.store_bit(self.ihr_disabled)?;
        builder.store_bit(self.bounce)?;
        builder.store_bit(self.bounced)?;
        builder.store_address(self.src.as_ref())?;
        builder.store_address(Some(&self.dest))?;
        self.value.store(builder)?;
        builder.store_coins(&self.ihr_fee)?;
        builder.store_coins(&self.fwd_fee)?;
        builder.store_uint(self.created_lt, 64)?;
        builder.store_uint(self.created_at as u64, 32)?;
        Ok(())
    }

    fn load(slice: &mut Slice) -> Result<Self> {
        Ok(Self {
            ihr_disabled: slice.load_bit()?,
            bounce: slice.load_bit()?,
            bounced: slice.load_bit()?,
            src: slice.load_address()?,
            dest: require_internal(slice.load_address()?, "dest")?,
            value: CurrencyCollection::load(slice)?,
            ihr_fee: slice.load_coins()?,
            fwd_fee: slice.load_coins()?,
            created_lt: slice.load_u64()?,
            created_at: slice.load_u32()?,
        })
    }
}

/// ```tlb
/// ext_in_msg_info$10 src:MsgAddressExt dest:MsgAddressInt
///   import_fee:Grams
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalInMsgInfo {
    pub src: Option<ExternalAddress>,
    pub dest: Address,
    pub import_fee: BigUint,
}

impl ExternalInMsgInfo {
    /// An inbound external message addressed to `dest`
    pub fn new(dest: Address) -> Self {
        Self {
            src: None,
            dest,
            import_fee: BigUint::ZERO,
        }
    }

    fn store(&self, builder: &mut CellBuilder) -> Result<()> {
        store_external(builder, self.src.as_ref())?;
        builder.store_address(Some(&self.dest))?;
        builder.store_coins(&self.import_fee)?;
        Ok(())
    }

    fn load(slice: &mut Slice) -> Result<Self> {
        Ok(Self {
            src: load_external(slice)?,
            dest: require_internal(slice.load_address()?, "dest")?,
            import_fee: slice.load_coins()?,
        })
    }
}

/// ```tlb
/// ext_out_msg_info$11 src:MsgAddress dest:MsgAddressExt
///   created_lt:uint64 created_at:uint32
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalOutMsgInfo {
    pub src: Option<Address>,
    pub dest: Option<ExternalAddress>,
    pub created_lt: u64,
    pub created_at: u32,
}

impl ExternalOutMsgInfo {
    fn store(&self, builder: &mut CellBuilder) -> Result<()> {
        builder.store_address(self.src.as_ref())?;
        store_external(builder, self.dest.as_ref())?;
        builder.store_uint(self.created_lt, 64)?;
        builder.store_uint(self.created_at as u64, 32)?;
        Ok(())
    }

    fn load(slice: &mut Slice) -> Result<Self> {
        Ok(Self {
            src: slice.load_address()?,
            dest: load_external(slice)?,
            created_lt: slice.load_u64()?,
            created_at: slice.load_u32()?,
        })
    }
}

/// The `info` field of a [`Message`]: a closed tagged union dispatched on
/// a short fixed-width tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonMsgInfo {
    /// `int_msg_info$0`
    Internal(InternalMsgInfo),
    /// `ext_in_msg_info$10`
    ExternalIn(ExternalInMsgInfo),
    /// `ext_out_msg_info$11`
    ExternalOut(ExternalOutMsgInfo),
}

impl CommonMsgInfo {
    /// Writes the variant tag followed by the variant payload
    pub fn store(&self, builder: &mut CellBuilder) -> Result<()> {
        match self {
            Self::Internal(info) => {
                builder.store_bit(false)?;
                info.store(builder)
            }
            Self::ExternalIn(info) => {
                builder.store_uint(0b10, 2)?;
                info.store(builder)
            }
            Self::ExternalOut(info) => {
                builder.store_uint(0b11, 2)?;
                info.store(builder)
            }
        }
    }

    /// Dispatches on the variant tag
    pub fn load(slice: &mut Slice) -> Result<Self> {
        if !slice.load_bit()? {
            Ok(Self::Internal(InternalMsgInfo::load(slice)?))
        } else if !slice.load_bit()? {
            Ok(Self::ExternalIn(ExternalInMsgInfo::load(slice)?))
        } else {
            Ok(Self::ExternalOut(ExternalOutMsgInfo::load(slice)?))
        }
    }
}

/// A message envelope: routing info, optional state-init, optional body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub info: CommonMsgInfo,
    pub init: Option<StateInit>,
    pub body: Option<ArcCell>,
}

impl Message {
    /// Creates a message with no state-init and no body
    pub fn new(info: CommonMsgInfo) -> Self {
        Self {
            info,
            init: None,
            body: None,
        }
    }

    /// Attaches a state-init block (deploys the account on delivery)
    pub fn with_state_init(mut self, init: StateInit) -> Self {
        self.init = Some(init);
        self
    }

    /// Attaches a body cell
    pub fn with_body(mut self, body: ArcCell) -> Self {
        self.body = Some(body);
        self
    }

    /// Writes `info`, then `init:(Maybe (Either StateInit ^StateInit))`,
    /// then `body:(Either X ^X)`. Init and body are placed inline when the
    /// remaining bit/ref budget allows and by reference otherwise.
    pub fn store(&self, builder: &mut CellBuilder) -> Result<()> {
        self.info.store(builder)?;

        match &self.init {
            None => {
                builder.store_bit(false)?;
            }
            Some(init) => {
                builder.store_bit(true)?;
                let cell = init.to_cell()?;
                // keep one reference free for a by-reference body
                let fits = builder.remaining_bits() >= 1 + cell.bit_len()
                    && builder.remaining_refs() >= cell.reference_count() + 1;
                builder.store_bit(!fits)?;
                if fits {
                    builder.store_cell(&cell)?;
                } else {
                    builder.store_ref(cell)?;
                }
            }
        }

        match &self.body {
            None => {
                builder.store_bit(false)?;
            }
            Some(body) => {
                let fits = builder.remaining_bits() >= 1 + body.bit_len()
                    && builder.remaining_refs() >= body.reference_count();
                builder.store_bit(!fits)?;
                if fits {
                    builder.store_cell(body)?;
                } else {
                    builder.store_ref(body.clone())?;
                }
            }
        }

        Ok(())
    }

    /// Reads the fields written by [`Message::store`], accepting either
    /// arm of the init and body `Either`s
    pub fn load(slice: &mut Slice) -> Result<Self> {
        let info = CommonMsgInfo::load(slice)?;

        let init = if slice.load_bit()? {
            if slice.load_bit()? {
                let cell = slice.load_ref()?;
                Some(StateInit::from_cell(&cell)?)
            } else {
                Some(StateInit::load(slice)?)
            }
        } else {
            None
        };

        let body = if slice.load_bit()? {
            Some(slice.load_ref()?)
        } else if slice.is_empty() {
            None
        } else {
            let mut builder = CellBuilder::new();
            builder.store_slice(slice)?;
            Some(builder.build()?)
        };

        Ok(Self { info, init, body })
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
}

fn require_internal(address: Option<Address>, field: &str) -> Result<Address> {
    address.ok_or_else(|| {
        CellError::SchemaMismatch(format!("{field}: expected an internal address"))
    })
}

fn store_external(builder: &mut CellBuilder, address: Option<&ExternalAddress>) -> Result<()> {
    match address {
        None => {
            builder.store_uint(0b00, 2)?;
        }
        Some(ext) => {
            builder.store_external_address(ext)?;
        }
    }
    Ok(())
}

fn load_external(slice: &mut Slice) -> Result<Option<ExternalAddress>> {
    match slice.load_uint(2)? {
        0b00 => Ok(None),
        0b01 => {
            let bit_len = slice.load_uint(9)? as usize;
            let value = if bit_len == 0 {
                None
            } else if bit_len <= 64 {
                Some(slice.load_uint(bit_len)?)
            } else {
                return Err(CellError::SchemaMismatch(
                    "external addresses longer than 64 bits are not supported".into(),
                ));
            };
            Ok(Some(ExternalAddress { value, bit_len }))
        }
        tag => Err(CellError::SchemaMismatch(format!(
            "expected an external address, got tag {tag:#04b}"
        ))),
    }
}
