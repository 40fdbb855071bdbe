// This module implements the data-area and section classifier for the V810
// target. Every global or static symbol is assigned to one of four addressing
// regions when it is declared: the normal region, or one of three reduced-range
// regions (tiny, short, zero) that a code generator can address directly off a
// dedicated base register. The classifier owns the nestable "current default
// area" stack driven by the pragma-style directives, the interrupt-attribute
// flag, and the symbol registry the assembly emitter queries for section names,
// alignment, and emission kind.

//! Data areas and section placement.

use std::fmt;

use hashbrown::HashMap;

use crate::addressing::SymbolRef;
use crate::error::{TargetError, TargetResult};
use crate::register_file::Reg;

/// The four data regions of the V810.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataArea {
    #[default]
    Normal,
    /// Tiny data area, addressed off `tp`.
    Tiny,
    /// Short data area, addressed off `gp`.
    Short,
    /// Zero data area, addressed off `r0`.
    Zero,
}

/// How a symbol's storage is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmissionKind {
    /// Initialized data.
    Data,
    /// Uninitialized, unique (local bss-style) storage.
    Bss,
    /// Uninitialized common storage, merged by the linker.
    Common,
}

/// What the emitter needs to place one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionInfo {
    /// Section name, or the common directive for common symbols.
    pub name: &'static str,
    pub size: u32,
    pub align: u32,
    pub kind: EmissionKind,
}

impl DataArea {
    pub const fn name(self) -> &'static str {
        match self {
            DataArea::Normal => "normal",
            DataArea::Tiny => "tiny",
            DataArea::Short => "short",
            DataArea::Zero => "zero",
        }
    }

    /// The base register an address in this area implicitly uses.
    pub const fn base_reg(self) -> Option<Reg> {
        match self {
            DataArea::Normal => None,
            DataArea::Tiny => Some(Reg::TP),
            DataArea::Short => Some(Reg::GP),
            DataArea::Zero => Some(Reg::ZERO),
        }
    }

    /// Whether this is one of the reduced-range areas with the cheaper
    /// addressing form.
    pub const fn is_small(self) -> bool {
        !matches!(self, DataArea::Normal)
    }

    /// Section name (or common directive) for the given emission kind.
    pub const fn section(self, kind: EmissionKind) -> &'static str {
        match (self, kind) {
            (DataArea::Normal, EmissionKind::Data) => ".data",
            (DataArea::Normal, EmissionKind::Bss) => ".bss",
            (DataArea::Normal, EmissionKind::Common) => ".comm",
            (DataArea::Tiny, EmissionKind::Data) => ".tdata",
            (DataArea::Tiny, EmissionKind::Bss) => ".tbss",
            (DataArea::Tiny, EmissionKind::Common) => ".tcomm",
            (DataArea::Short, EmissionKind::Data) => ".sdata",
            (DataArea::Short, EmissionKind::Bss) => ".sbss",
            (DataArea::Short, EmissionKind::Common) => ".scomm",
            (DataArea::Zero, EmissionKind::Data) => ".zdata",
            (DataArea::Zero, EmissionKind::Bss) => ".zbss",
            (DataArea::Zero, EmissionKind::Common) => ".zcomm",
        }
    }
}

impl fmt::Display for DataArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
struct SymbolInfo {
    area: DataArea,
    size: u32,
    align: u32,
    kind: EmissionKind,
}

/// Declaration-time classifier state.
///
/// Tracks the nestable default-area overrides, the pending
/// interrupt-handler attribute, and every symbol declared so far.
/// Declarations are processed in a fixed sequential order by a single
/// front-end pass, so the context is owned by that pass and never shared.
#[derive(Debug, Default)]
pub struct DataAreaContext {
    default_stack: Vec<DataArea>,
    interrupt_pending: bool,
    symbols: HashMap<String, SymbolInfo>,
}

impl DataAreaContext {
    pub fn new() -> DataAreaContext {
        DataAreaContext::default()
    }

    /// The default area declarations currently fall into: the innermost
    /// pending override, or the normal area outside any directive block.
    pub fn current_default(&self) -> DataArea {
        self.default_stack.last().copied().unwrap_or(DataArea::Normal)
    }

    /// Enter a directive block that changes the default area.
    pub fn push_default(&mut self, area: DataArea) {
        self.default_stack.push(area);
    }

    /// Leave the innermost directive block. Popping with no block open is
    /// a contract violation: the directives must nest.
    pub fn pop_default(&mut self) -> DataArea {
        self.default_stack
            .pop()
            .expect("data area directive stack underflow")
    }

    /// Mark the next function as an interrupt handler.
    pub fn begin_interrupt(&mut self) {
        self.interrupt_pending = true;
    }

    pub fn end_interrupt(&mut self) {
        self.interrupt_pending = false;
    }

    /// Consume the pending interrupt attribute; the function lowerer calls
    /// this once per function definition.
    pub fn take_interrupt(&mut self) -> bool {
        std::mem::take(&mut self.interrupt_pending)
    }

    /// Declare a symbol and fix its data area: an explicit annotation
    /// wins, otherwise the current default applies. The choice is made
    /// once; a redeclaration naming a different area is rejected.
    pub fn declare(
        &mut self,
        name: &str,
        annotation: Option<DataArea>,
        size: u32,
        align: u32,
        kind: EmissionKind,
    ) -> TargetResult<DataArea> {
        let area = annotation.unwrap_or_else(|| self.current_default());
        if let Some(existing) = self.symbols.get(name) {
            if existing.area != area {
                return Err(TargetError::DataAreaConflict {
                    symbol: name.to_string(),
                    declared: existing.area,
                    requested: area,
                });
            }
        }
        log::debug!("placing `{name}` in the {area} data area");
        self.symbols
            .insert(name.to_string(), SymbolInfo { area, size, align, kind });
        Ok(area)
    }

    /// The area a symbol was declared into; undeclared symbols read as
    /// normal-area.
    pub fn area_of(&self, name: &str) -> DataArea {
        self.symbols
            .get(name)
            .map(|info| info.area)
            .unwrap_or(DataArea::Normal)
    }

    /// Build the tagged reference the addressing checker consumes.
    pub fn symbol_ref(&self, name: &str) -> SymbolRef {
        SymbolRef::new(name, self.area_of(name))
    }

    /// Placement lookup for the emitter: section name, size, alignment,
    /// and emission kind. `None` for symbols never declared here.
    pub fn section_of(&self, name: &str) -> Option<SectionInfo> {
        self.symbols.get(name).map(|info| SectionInfo {
            name: info.area.section(info.kind),
            size: info.size,
            align: info.align,
            kind: info.kind,
        })
    }
}
