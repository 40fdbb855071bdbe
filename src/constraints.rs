// This module implements the operand constraint alphabet for the V810 target.
// Constraints are single-character predicates an instruction template names for
// each of its operand slots; the code generator and register allocator query
// them to decide whether a candidate operand is directly usable or must be
// legalized first. Integer constraints are closed-form range/bit tests (zero,
// signed 5-bit, small displacement, high-halfword, unsigned 16-bit, shift
// count, power-of-two and its complement); the memory and address constraints
// delegate to the addressing-mode legality checker. The table is a closed enum
// built at compile time, so it cannot be redefined or extended at run time.

//! Operand constraints.

use crate::addressing::{is_legal_address, AccessWidth, AddressExpr, SymbolOrConst};
use crate::error::{TargetError, TargetResult};

/// The constraint alphabet. Each tag carries exactly one predicate and one
/// semantic category; instruction operand slots name the tags they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// The integer zero.
    I,
    /// A signed 5-bit immediate.
    J,
    /// A small signed displacement, the window load/store addressing uses.
    K,
    /// A high-halfword constant: low 16 bits zero.
    L,
    /// An unsigned 16-bit immediate.
    M,
    /// A shift count.
    N,
    /// A power of two.
    O,
    /// A nonzero value that is not a power of two.
    P,
    /// A legal memory reference.
    Q,
    /// A legal address computation.
    R,
    /// A symbol placed in one of the reduced-range data areas.
    S,
}

/// Semantic category of a constraint, used by the allocator to decide
/// whether an operand may be rematerialized as an immediate or has to
/// occupy a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// Closed-form test over an integer immediate.
    IntRange,
    /// A memory reference, validated by the addressing checker.
    Memory,
    /// An address computation, validated by the addressing checker.
    Address,
}

/// An operand as presented by the code generator for constraint checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// An integer immediate.
    Imm(i64),
    /// A memory reference with its access width.
    Mem { addr: AddressExpr, width: AccessWidth },
    /// A bare address computation (no access implied).
    Addr(AddressExpr),
}

impl Constraint {
    /// Every registered constraint, in table order.
    pub const ALL: [Constraint; 11] = [
        Constraint::I,
        Constraint::J,
        Constraint::K,
        Constraint::L,
        Constraint::M,
        Constraint::N,
        Constraint::O,
        Constraint::P,
        Constraint::Q,
        Constraint::R,
        Constraint::S,
    ];

    /// Look up a constraint by its single-character name. Pure and
    /// idempotent; unknown names are reported, not registered.
    pub fn lookup(name: char) -> TargetResult<Constraint> {
        match name {
            'I' => Ok(Constraint::I),
            'J' => Ok(Constraint::J),
            'K' => Ok(Constraint::K),
            'L' => Ok(Constraint::L),
            'M' => Ok(Constraint::M),
            'N' => Ok(Constraint::N),
            'O' => Ok(Constraint::O),
            'P' => Ok(Constraint::P),
            'Q' => Ok(Constraint::Q),
            'R' => Ok(Constraint::R),
            'S' => Ok(Constraint::S),
            _ => Err(TargetError::UnknownConstraint(name)),
        }
    }

    pub const fn name(self) -> char {
        match self {
            Constraint::I => 'I',
            Constraint::J => 'J',
            Constraint::K => 'K',
            Constraint::L => 'L',
            Constraint::M => 'M',
            Constraint::N => 'N',
            Constraint::O => 'O',
            Constraint::P => 'P',
            Constraint::Q => 'Q',
            Constraint::R => 'R',
            Constraint::S => 'S',
        }
    }

    pub const fn kind(self) -> ConstraintKind {
        match self {
            Constraint::I
            | Constraint::J
            | Constraint::K
            | Constraint::L
            | Constraint::M
            | Constraint::N
            | Constraint::O
            | Constraint::P => ConstraintKind::IntRange,
            Constraint::Q => ConstraintKind::Memory,
            Constraint::R | Constraint::S => ConstraintKind::Address,
        }
    }

    /// Closed-form immediate test. Memory and address constraints accept
    /// no immediate at all.
    pub const fn accepts_int(self, value: i64) -> bool {
        match self {
            Constraint::I => value == 0,
            Constraint::J => -16 <= value && value <= 15,
            Constraint::K => -256 <= value && value <= 255,
            Constraint::L => value & 0xffff == 0 && {
                let high = value >> 16;
                -0x8000 <= high && high <= 0x7fff
            },
            Constraint::M => 0 <= value && value <= 0xffff,
            Constraint::N => 0 <= value && value <= 31,
            Constraint::O => value > 0 && value & (value - 1) == 0,
            Constraint::P => value != 0 && !(value > 0 && value & (value - 1) == 0),
            Constraint::Q | Constraint::R | Constraint::S => false,
        }
    }

    /// Full predicate over an operand. Integer constraints only match
    /// immediates; the memory and address constraints delegate to the
    /// addressing checker.
    pub fn satisfied_by(self, operand: &Operand) -> bool {
        match self.kind() {
            ConstraintKind::IntRange => match operand {
                Operand::Imm(value) => self.accepts_int(*value),
                _ => false,
            },
            ConstraintKind::Memory => match operand {
                Operand::Mem { addr, width } => is_legal_address(addr, *width),
                _ => false,
            },
            ConstraintKind::Address => match (self, operand) {
                (Constraint::R, Operand::Addr(addr)) => {
                    is_legal_address(addr, AccessWidth::Word)
                }
                (Constraint::S, Operand::Addr(addr)) => match addr {
                    AddressExpr::Absolute(SymbolOrConst::Symbol(sym)) => sym.area.is_small(),
                    _ => false,
                },
                _ => false,
            },
        }
    }
}
