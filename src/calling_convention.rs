// This module implements the V810 calling convention and stack frame layout.
// It provides CallState to classify call arguments into registers or outgoing
// stack slots according to the ABI, the return-value placement policy, and
// FrameLayout/FunctionFrame to compute per-function frame areas and the
// offsets for eliminating the argument and frame pointers against the stack
// pointer. Key features: the first sixteen bytes of arguments pass in r6-r9,
// stack space is conservatively reserved so a callee can spill its register
// arguments, return values use r10 (low word first), aggregates always return
// through a hidden pointer, and saved registers are listed highest-first so a
// helper routine can save and restore a contiguous suffix.

//! Calling convention and frame layout.

use bumpalo::{collections::Vec as BumpVec, Bump};

use crate::error::{TargetError, TargetResult};
use crate::register_file::{
    Reg, RegClass, RegSet, CALLEE_SAVED_REGS, CALL_CLOBBERED_REGS, WORD_SIZE,
};

/// Argument registers, in assignment order.
pub const ARG_REGS: [Reg; 4] = [Reg::new(6), Reg::new(7), Reg::new(8), Reg::new(9)];

/// Bytes of argument data the argument registers can carry.
pub const ARG_AREA_BYTES: u32 = ARG_REGS.len() as u32 * WORD_SIZE;

/// Return value register; wide scalars put their low word here.
pub const RETURN_VALUE_REG: Reg = Reg::new(10);

/// Second word of a double-word scalar return.
pub const RETURN_VALUE_HIGH_REG: Reg = Reg::new(11);

/// Static chain register for nested-function trampolines.
pub const STATIC_CHAIN_REG: Reg = Reg::new(20);

const fn align_word(bytes: u32) -> u32 {
    (bytes + WORD_SIZE - 1) & !(WORD_SIZE - 1)
}

/// Where one call argument lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgLocation {
    /// In `count` consecutive registers starting at `first`.
    Reg { first: Reg, count: u32 },
    /// In the outgoing-argument stack area, at a word-aligned byte offset
    /// from its start.
    Stack { offset: u32 },
}

/// Where a function's return value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetLocation {
    /// In `count` consecutive registers starting at [`RETURN_VALUE_REG`].
    Reg { first: Reg, count: u32 },
    /// Written through a hidden pointer passed by the caller.
    Memory,
}

/// Whether a value of the given shape is returned through a hidden
/// pointer. Aggregates always are; there is no small-struct-in-registers
/// special case.
pub const fn returns_in_memory(is_aggregate: bool) -> bool {
    is_aggregate
}

/// Return-value placement. `size` must be nonzero (a void function has no
/// return location to ask for).
pub fn return_location(size: u32, is_aggregate: bool) -> RetLocation {
    debug_assert!(size > 0, "no return location for a zero-sized value");
    if returns_in_memory(is_aggregate) {
        RetLocation::Memory
    } else {
        RetLocation::Reg {
            first: RETURN_VALUE_REG,
            count: align_word(size) / WORD_SIZE,
        }
    }
}

/// Per-call-site argument classification state.
///
/// Created fresh when lowering of a call starts, advanced once per
/// argument left to right, and discarded when the call is lowered. The
/// byte counter advances by the rounded-up size of every argument whether
/// it went to a register or to the stack: stack space is reserved under
/// both paths so the callee can spill its register arguments.
#[derive(Debug, Clone, Default)]
pub struct CallState {
    nbytes: u32,
    anonymous_args: bool,
}

impl CallState {
    pub fn new() -> CallState {
        CallState::default()
    }

    /// Classify the next argument. `named` is false for the anonymous
    /// tail of a variadic call, which never rides in registers so that
    /// `va_start` finds every anonymous word in memory.
    pub fn assign_arg(&mut self, size: u32, named: bool) -> TargetResult<ArgLocation> {
        if size == 0 {
            return Err(TargetError::UnclassifiableArgument { size });
        }
        let rounded = align_word(size);

        let location = if named && self.nbytes + rounded <= ARG_AREA_BYTES {
            let first = ARG_REGS[(self.nbytes / WORD_SIZE) as usize];
            ArgLocation::Reg {
                first,
                count: rounded / WORD_SIZE,
            }
        } else {
            if !named {
                self.anonymous_args = true;
            }
            // Once one argument spills, the rest of the register area is
            // dead: slots are consumed by position, never backfilled.
            if self.nbytes < ARG_AREA_BYTES {
                self.nbytes = ARG_AREA_BYTES;
            }
            let offset = self.nbytes - ARG_AREA_BYTES;
            log::debug!("{rounded}-byte argument to stack at +{offset}");
            ArgLocation::Stack { offset }
        };

        self.nbytes += rounded;
        Ok(location)
    }

    /// Bytes of argument space consumed so far, register and stack alike.
    pub fn bytes_consumed(&self) -> u32 {
        self.nbytes
    }

    /// Whether any anonymous argument has been classified.
    pub fn has_anonymous_args(&self) -> bool {
        self.anonymous_args
    }
}

/// Everything about a function's body the frame layout depends on.
#[derive(Debug, Clone, Default)]
pub struct FunctionShape {
    /// Bytes of local variables.
    pub locals_size: u32,
    /// Bytes of the largest outgoing-argument area of any call site.
    pub outgoing_args_size: u32,
    /// Hard registers the function's code touches.
    pub used_regs: RegSet,
    /// True when the function makes no calls.
    pub is_leaf: bool,
    /// True when the function allocates stack dynamically.
    pub has_alloca: bool,
    /// True when the function was declared an interrupt handler.
    pub interrupt_handler: bool,
}

/// Frame areas and elimination offsets for one function.
///
/// Computed once from the accumulated [`FunctionShape`], immutable for the
/// rest of that function's code generation. The frame grows downward with
/// locals nearest the stack pointer end:
///
/// ```text
///   incoming arguments      <- ap (eliminated)
///   saved registers
///                           <- fp (if materialized)
///   locals
///   outgoing arguments      <- sp
/// ```
#[derive(Debug)]
pub struct FrameLayout<'a> {
    locals_size: u32,
    save_area_size: u32,
    outgoing_args_size: u32,
    saved_regs: BumpVec<'a, Reg>,
    frame_pointer_needed: bool,
}

impl<'a> FrameLayout<'a> {
    /// Compute the layout for a function of the given shape, allocating
    /// the saved-register list in `arena`.
    pub fn compute(shape: &FunctionShape, arena: &'a Bump) -> FrameLayout<'a> {
        let mut save_set = shape.used_regs.intersect(CALLEE_SAVED_REGS);
        if shape.interrupt_handler {
            // An interrupt arrives with everything live, so the clobbered
            // allocatable registers the handler touches are saved too.
            // r30 is included only when actually used.
            let clobbered = CALL_CLOBBERED_REGS.intersect(RegClass::General.contents());
            save_set = save_set.union(shape.used_regs.intersect(clobbered));
        }
        if !shape.is_leaf || shape.used_regs.contains(Reg::LP) {
            save_set.insert(Reg::LP);
        }

        // Highest register first: the save/restore helpers take over a
        // contiguous suffix of the register file.
        let mut saved_regs = BumpVec::new_in(arena);
        saved_regs.extend(save_set.iter().rev());

        let layout = FrameLayout {
            locals_size: align_word(shape.locals_size),
            save_area_size: save_set.len() * WORD_SIZE,
            outgoing_args_size: align_word(shape.outgoing_args_size),
            saved_regs,
            frame_pointer_needed: shape.has_alloca,
        };
        log::debug!(
            "frame: {} locals + {} saved + {} outgoing",
            layout.locals_size,
            layout.save_area_size,
            layout.outgoing_args_size
        );
        layout
    }

    pub fn locals_size(&self) -> u32 {
        self.locals_size
    }

    pub fn save_area_size(&self) -> u32 {
        self.save_area_size
    }

    pub fn outgoing_args_size(&self) -> u32 {
        self.outgoing_args_size
    }

    /// Registers the prologue saves, highest-numbered first.
    pub fn saved_regs(&self) -> &[Reg] {
        &self.saved_regs
    }

    /// Total stack adjustment the prologue performs.
    pub fn frame_size(&self) -> u32 {
        self.locals_size + self.save_area_size + self.outgoing_args_size
    }

    /// Whether a frame pointer must be materialized.
    pub fn frame_pointer_needed(&self) -> bool {
        self.frame_pointer_needed
    }

    /// Whether the given pointer elimination is usable for this frame.
    /// Replacing either pointer with `sp` requires the frame to be fixed
    /// size; the argument pointer can always fall back to `fp`.
    pub fn can_eliminate(&self, from: Reg, to: Reg) -> bool {
        match (from, to) {
            (Reg::AP, Reg::SP) | (Reg::FP, Reg::SP) => !self.frame_pointer_needed,
            (Reg::AP, Reg::FP) => true,
            _ => false,
        }
    }

    /// The byte offset added when rewriting `from`-relative addresses as
    /// `to`-relative. Only the three supported eliminations are valid;
    /// anything else is a contract violation.
    pub fn elimination_offset(&self, from: Reg, to: Reg) -> u32 {
        match (from, to) {
            (Reg::AP, Reg::SP) => self.frame_size(),
            (Reg::AP, Reg::FP) => self.save_area_size,
            (Reg::FP, Reg::SP) => self.locals_size + self.outgoing_args_size,
            _ => panic!("unsupported register elimination {from} -> {to}"),
        }
    }

    /// The elimination the code generator should prefer for the argument
    /// pointer: straight to `sp` for fixed-size frames, else via `fp`.
    pub fn preferred_elimination(&self) -> (Reg, Reg) {
        if self.frame_pointer_needed {
            (Reg::AP, Reg::FP)
        } else {
            (Reg::AP, Reg::SP)
        }
    }
}

/// Per-function frame record: the mutable shape while the function is
/// being scanned, then the immutable layout once computed.
#[derive(Debug, Default)]
pub struct FunctionFrame<'a> {
    shape: FunctionShape,
    layout: Option<FrameLayout<'a>>,
}

impl<'a> FunctionFrame<'a> {
    pub fn new(shape: FunctionShape) -> FunctionFrame<'a> {
        FunctionFrame { shape, layout: None }
    }

    pub fn shape(&self) -> &FunctionShape {
        &self.shape
    }

    /// The shape may be refined up until the layout is computed.
    pub fn shape_mut(&mut self) -> &mut FunctionShape {
        assert!(
            self.layout.is_none(),
            "function shape changed after frame layout was computed"
        );
        &mut self.shape
    }

    /// Compute the layout. Exactly once per function; the result is
    /// immutable for the remainder of code generation.
    pub fn compute_layout(&mut self, arena: &'a Bump) {
        assert!(self.layout.is_none(), "frame layout already computed");
        self.layout = Some(FrameLayout::compute(&self.shape, arena));
    }

    /// The computed layout. Querying before [`Self::compute_layout`] is a
    /// contract violation.
    pub fn layout(&self) -> &FrameLayout<'a> {
        self.layout
            .as_ref()
            .expect("frame layout queried before computation")
    }
}

/// Registers the epilogue implicitly keeps live: after register
/// allocation has completed, the link pointer's liveness past its final
/// textual use is not discoverable by dataflow, so the epilogue declares
/// it used.
pub fn epilogue_uses(reg: Reg, reload_completed: bool) -> bool {
    reload_completed && reg == Reg::LP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_word_args_all_in_registers() {
        let mut state = CallState::new();
        for (i, arg_reg) in ARG_REGS.iter().enumerate() {
            let loc = state.assign_arg(4, true).unwrap();
            assert_eq!(loc, ArgLocation::Reg { first: *arg_reg, count: 1 }, "arg {i}");
        }
        assert_eq!(state.bytes_consumed(), 16);
    }

    #[test]
    fn test_fifth_word_arg_spills_at_offset_zero() {
        let mut state = CallState::new();
        for _ in 0..4 {
            state.assign_arg(4, true).unwrap();
        }
        let loc = state.assign_arg(4, true).unwrap();
        assert_eq!(loc, ArgLocation::Stack { offset: 0 });
        assert_eq!(state.bytes_consumed(), 20);

        // Stack slots continue gap-free.
        let loc = state.assign_arg(1, true).unwrap();
        assert_eq!(loc, ArgLocation::Stack { offset: 4 });
        assert_eq!(state.bytes_consumed(), 24);
    }

    #[test]
    fn test_sub_word_args_round_up() {
        let mut state = CallState::new();
        assert_eq!(
            state.assign_arg(1, true).unwrap(),
            ArgLocation::Reg { first: ARG_REGS[0], count: 1 }
        );
        assert_eq!(
            state.assign_arg(2, true).unwrap(),
            ArgLocation::Reg { first: ARG_REGS[1], count: 1 }
        );
        assert_eq!(state.bytes_consumed(), 8);
    }

    #[test]
    fn test_double_word_arg_takes_register_pair() {
        let mut state = CallState::new();
        assert_eq!(
            state.assign_arg(8, true).unwrap(),
            ArgLocation::Reg { first: ARG_REGS[0], count: 2 }
        );
        assert_eq!(
            state.assign_arg(8, true).unwrap(),
            ArgLocation::Reg { first: ARG_REGS[2], count: 2 }
        );
        assert_eq!(state.bytes_consumed(), 16);
    }

    #[test]
    fn test_wide_arg_abandons_partial_register_area() {
        let mut state = CallState::new();
        state.assign_arg(4, true).unwrap();
        state.assign_arg(4, true).unwrap();
        state.assign_arg(4, true).unwrap();
        // Twelve bytes used; an eight-byte value no longer fits in
        // registers and the remaining slot is not backfilled.
        let loc = state.assign_arg(8, true).unwrap();
        assert_eq!(loc, ArgLocation::Stack { offset: 0 });
        let loc = state.assign_arg(4, true).unwrap();
        assert_eq!(loc, ArgLocation::Stack { offset: 8 });
    }

    #[test]
    fn test_anonymous_args_always_on_stack() {
        let mut state = CallState::new();
        state.assign_arg(4, true).unwrap();
        assert!(!state.has_anonymous_args());
        let loc = state.assign_arg(4, false).unwrap();
        assert_eq!(loc, ArgLocation::Stack { offset: 0 });
        assert!(state.has_anonymous_args());
        assert_eq!(state.bytes_consumed(), 20);
    }

    #[test]
    fn test_zero_sized_arg_is_reported() {
        let mut state = CallState::new();
        assert_eq!(
            state.assign_arg(0, true),
            Err(TargetError::UnclassifiableArgument { size: 0 })
        );
        assert_eq!(state.bytes_consumed(), 0);
    }

    #[test]
    fn test_return_locations() {
        assert_eq!(
            return_location(4, false),
            RetLocation::Reg { first: RETURN_VALUE_REG, count: 1 }
        );
        assert_eq!(
            return_location(1, false),
            RetLocation::Reg { first: RETURN_VALUE_REG, count: 1 }
        );
        assert_eq!(
            return_location(8, false),
            RetLocation::Reg { first: RETURN_VALUE_REG, count: 2 }
        );
        assert_eq!(return_location(8, true), RetLocation::Memory);
        assert_eq!(return_location(4, true), RetLocation::Memory);
        assert!(returns_in_memory(true));
        assert!(!returns_in_memory(false));
    }

    fn shape_with(locals: u32, outgoing: u32, used: &[u8]) -> FunctionShape {
        FunctionShape {
            locals_size: locals,
            outgoing_args_size: outgoing,
            used_regs: used.iter().map(|&n| Reg::new(n)).collect(),
            ..FunctionShape::default()
        }
    }

    #[test]
    fn test_frame_elimination_round_trip() {
        let arena = Bump::new();
        let mut shape = shape_with(24, 8, &[20, 21, 12]);
        shape.is_leaf = true;
        let layout = FrameLayout::compute(&shape, &arena);

        // r20 and r21 saved; r12 is clobbered and needs no slot.
        assert_eq!(layout.saved_regs(), [Reg::new(21), Reg::new(20)]);
        assert_eq!(layout.save_area_size(), 8);
        assert_eq!(
            layout.elimination_offset(Reg::AP, Reg::SP),
            24 + 8 + 8
        );
        // The two-step path agrees with the direct one.
        assert_eq!(
            layout.elimination_offset(Reg::AP, Reg::FP)
                + layout.elimination_offset(Reg::FP, Reg::SP),
            layout.elimination_offset(Reg::AP, Reg::SP)
        );
    }

    #[test]
    fn test_non_leaf_saves_link_pointer() {
        let arena = Bump::new();
        let shape = shape_with(0, 16, &[]);
        let layout = FrameLayout::compute(&shape, &arena);
        assert_eq!(layout.saved_regs(), [Reg::LP]);
        assert_eq!(layout.frame_size(), 4 + 16);
    }

    #[test]
    fn test_leaf_frame_saves_nothing() {
        let arena = Bump::new();
        let mut shape = shape_with(8, 0, &[12, 13]);
        shape.is_leaf = true;
        let layout = FrameLayout::compute(&shape, &arena);
        assert!(layout.saved_regs().is_empty());
        assert_eq!(layout.frame_size(), 8);
        assert!(!layout.frame_pointer_needed());
        assert_eq!(layout.preferred_elimination(), (Reg::AP, Reg::SP));
        assert!(layout.can_eliminate(Reg::FP, Reg::SP));
    }

    #[test]
    fn test_alloca_forces_frame_pointer() {
        let arena = Bump::new();
        let mut shape = shape_with(8, 0, &[]);
        shape.is_leaf = true;
        shape.has_alloca = true;
        let layout = FrameLayout::compute(&shape, &arena);
        assert!(layout.frame_pointer_needed());
        assert_eq!(layout.preferred_elimination(), (Reg::AP, Reg::FP));
        assert!(!layout.can_eliminate(Reg::AP, Reg::SP));
        assert!(!layout.can_eliminate(Reg::FP, Reg::SP));
        assert!(layout.can_eliminate(Reg::AP, Reg::FP));
    }

    #[test]
    fn test_interrupt_handler_saves_used_clobbered_regs() {
        let arena = Bump::new();
        let mut shape = shape_with(0, 0, &[12, 20]);
        shape.is_leaf = true;
        shape.interrupt_handler = true;
        let layout = FrameLayout::compute(&shape, &arena);
        assert_eq!(layout.saved_regs(), [Reg::new(20), Reg::new(12)]);

        // r30 is saved only when the handler actually touches it.
        let mut shape = shape_with(0, 0, &[30]);
        shape.is_leaf = true;
        shape.interrupt_handler = true;
        let layout = FrameLayout::compute(&shape, &arena);
        assert_eq!(layout.saved_regs(), [Reg::new(30)]);

        let mut shape = shape_with(0, 0, &[]);
        shape.is_leaf = true;
        shape.interrupt_handler = true;
        let layout = FrameLayout::compute(&shape, &arena);
        assert!(layout.saved_regs().is_empty());
    }

    #[test]
    #[should_panic(expected = "unsupported register elimination")]
    fn test_bogus_elimination_panics() {
        let arena = Bump::new();
        let layout = FrameLayout::compute(&FunctionShape::default(), &arena);
        let _ = layout.elimination_offset(Reg::SP, Reg::AP);
    }

    #[test]
    #[should_panic(expected = "frame layout queried before computation")]
    fn test_layout_query_before_compute_panics() {
        let frame = FunctionFrame::new(FunctionShape::default());
        let _ = frame.layout();
    }

    #[test]
    #[should_panic(expected = "frame layout already computed")]
    fn test_layout_recompute_panics() {
        let arena = Bump::new();
        let mut frame = FunctionFrame::new(FunctionShape::default());
        frame.compute_layout(&arena);
        frame.compute_layout(&arena);
    }

    #[test]
    fn test_epilogue_uses_link_pointer_after_reload() {
        assert!(epilogue_uses(Reg::LP, true));
        assert!(!epilogue_uses(Reg::LP, false));
        assert!(!epilogue_uses(Reg::new(10), true));
    }
}
