//! TL-B schema records
//!
//! Typed structures whose fields map 1:1 onto the network's binary schema:
//! message envelopes, state-init blocks and currency collections. Each
//! record is a stateless codec: `store` writes its fields into a
//! [`CellBuilder`](crate::tvm::CellBuilder) in schema order and `load`
//! reads them back from a [`Slice`](crate::tvm::Slice), failing with
//! `SchemaMismatch` on an unknown discriminator or `TruncatedCell` when
//! required bits or references are missing.

pub mod currency;
pub mod message;
pub mod state_init;

pub use currency::CurrencyCollection;
pub use message::{
    CommonMsgInfo, ExternalInMsgInfo, ExternalOutMsgInfo, InternalMsgInfo, Message,
};
pub use state_init::{StateInit, TickTock};
