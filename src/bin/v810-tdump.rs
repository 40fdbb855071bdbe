//! Target table dump binary.
//!
//! Prints the register file, allocation order, constraint alphabet, and
//! data-area tables in a human-readable form, for eyeballing the target
//! description against the hardware manual.

use clap::{Parser, Subcommand};

use v810_target::calling_convention::{ARG_REGS, RETURN_VALUE_REG, STATIC_CHAIN_REG};
use v810_target::constraints::Constraint;
use v810_target::data_area::{DataArea, EmissionKind};
use v810_target::register_file::{Reg, ALLOCATION_ORDER, NUM_REGS};

#[derive(Parser)]
#[command(name = "v810-tdump", about = "Dump the V810 target description tables")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Register file: names, fixedness, call behavior, classes.
    Regs,
    /// Allocation order handed to the register allocator.
    AllocOrder,
    /// Operand constraint alphabet.
    Constraints,
    /// Data areas and their sections.
    Areas,
}

fn dump_regs() {
    println!("{:<5} {:<5} {:<6} {:<10} {}", "id", "name", "fixed", "clobbered", "class");
    for num in 0..NUM_REGS {
        let reg = Reg::new(num);
        println!(
            "{:<5} {:<5} {:<6} {:<10} {:?}",
            num,
            reg.name(),
            reg.is_fixed(),
            reg.is_call_clobbered(),
            reg.class(),
        );
    }
    println!();
    println!("argument registers: {}", names(&ARG_REGS));
    println!("return value:       {}", RETURN_VALUE_REG.name());
    println!("static chain:       {}", STATIC_CHAIN_REG.name());
}

fn dump_alloc_order() {
    println!("{}", names(&ALLOCATION_ORDER));
}

fn dump_constraints() {
    for c in Constraint::ALL {
        println!("{}  {:?}", c.name(), c.kind());
    }
}

fn dump_areas() {
    println!(
        "{:<8} {:<6} {:<8} {:<8} {}",
        "area", "base", "data", "bss", "common"
    );
    for area in [DataArea::Normal, DataArea::Tiny, DataArea::Short, DataArea::Zero] {
        println!(
            "{:<8} {:<6} {:<8} {:<8} {}",
            area.name(),
            area.base_reg().map_or("-", Reg::name),
            area.section(EmissionKind::Data),
            area.section(EmissionKind::Bss),
            area.section(EmissionKind::Common),
        );
    }
}

fn names(regs: &[Reg]) -> String {
    regs.iter().map(|r| r.name()).collect::<Vec<_>>().join(" ")
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Regs) => dump_regs(),
        Some(Command::AllocOrder) => dump_alloc_order(),
        Some(Command::Constraints) => dump_constraints(),
        Some(Command::Areas) => dump_areas(),
        None => {
            dump_regs();
            println!();
            dump_alloc_order();
            println!();
            dump_constraints();
            println!();
            dump_areas();
        }
    }
}
