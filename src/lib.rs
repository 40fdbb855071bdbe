//! Target description for the NEC V810 family.
//!
//! This crate is the machine-dependent layer a retargetable code generator
//! queries when lowering to the V810: which hard registers exist and how
//! they may be used, which immediates and memory operands an instruction
//! slot accepts, how calls pass arguments and return values, how a
//! function's stack frame is laid out, and which linker section a global
//! belongs to. It answers questions; it does not select instructions or
//! emit anything.
//!
//! # Architecture
//!
//! - [`register_file`] - hard registers, classes, allocation order
//! - [`constraints`] - single-character operand constraint alphabet
//! - [`addressing`] - legality of candidate memory addresses
//! - [`calling_convention`] - argument passing, return values, frame layout
//! - [`data_area`] - tiny/short/zero data areas and section placement
//! - [`error`] - the recoverable error type
//!
//! All tables are fixed at build time; the only mutable state is the
//! per-call [`CallState`], the per-function [`FunctionFrame`], and the
//! declaration-time [`DataAreaContext`], each owned by the single pass
//! that drives it.

pub mod addressing;
pub mod calling_convention;
pub mod constraints;
pub mod data_area;
pub mod error;
pub mod register_file;

// Re-export the query surface.
pub use addressing::{is_legal_address, AccessWidth, AddressExpr, SymbolOrConst, SymbolRef};
pub use calling_convention::{
    epilogue_uses, return_location, returns_in_memory, ArgLocation, CallState, FrameLayout,
    FunctionFrame, FunctionShape, RetLocation, ARG_REGS, RETURN_VALUE_REG,
};
pub use constraints::{Constraint, ConstraintKind, Operand};
pub use data_area::{DataArea, DataAreaContext, EmissionKind, SectionInfo};
pub use error::{TargetError, TargetResult};
pub use register_file::{Reg, RegClass, RegSet, ALLOCATION_ORDER, NUM_REGS, WORD_SIZE};
