//! Error types shared by the cell data model.

use thiserror::Error;

/// Errors produced while building, reading or (de)serializing cells.
///
/// All failures are local and synchronous: an operation that returns an
/// error has not partially mutated its target.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CellError {
    /// An append would push a cell past the 1023-bit limit.
    #[error("cell capacity exceeded: need {needed} more bits, {available} available")]
    CapacityExceeded { needed: usize, available: usize },

    /// A cell already carries the maximum number of references.
    #[error("too many references: a cell holds at most {max}")]
    TooManyReferences { max: usize },

    /// A numeric value does not fit the declared bit width.
    #[error("value {value} does not fit into {bits} bits")]
    ValueOutOfRange { value: String, bits: usize },

    /// A read would run past the written data.
    #[error("read out of bounds: requested {requested} bits, {remaining} remaining")]
    OutOfBounds { requested: usize, remaining: usize },

    /// A Bag of Cells container violates the wire format.
    #[error("malformed bag of cells: {0}")]
    MalformedContainer(String),

    /// A cell ended before a schema field was fully read.
    #[error("truncated cell: {0}")]
    TruncatedCell(String),

    /// A discriminator tag does not match any known schema variant.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// An address string or record is not valid.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, CellError>;
