//! Error types for the target description layer.
//!
//! Using thiserror for more idiomatic error handling.
//!
//! Only recoverable conditions live here: an operand or argument that no
//! legality rule accepts is reported back so the code generator can
//! legalize it and retry. Programming-contract violations (an out-of-range
//! register id, popping an empty data-area stack, querying a frame layout
//! before it has been computed) panic instead; they indicate a bug in a
//! collaborator, not malformed input.

use thiserror::Error;

use crate::data_area::DataArea;

/// Main error type for target description queries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("unknown operand constraint `{0}`")]
    UnknownConstraint(char),

    #[error("cannot classify a {size}-byte call argument")]
    UnclassifiableArgument { size: u32 },

    #[error("data area of `{symbol}` conflicts: declared {declared}, requested {requested}")]
    DataAreaConflict {
        symbol: String,
        declared: DataArea,
        requested: DataArea,
    },
}

/// Result type alias for target description operations.
pub type TargetResult<T> = Result<T, TargetError>;
